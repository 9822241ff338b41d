use fractic_server_error::ServerError;

use crate::{
    config::AggregationConfig,
    domain::usecases::invoice_usecase::{InvoiceUsecase as _, InvoiceUsecaseImpl},
    entities::InvoiceRun,
    repositories::MileageCacheRepository,
};

/// Entry point for a billing run. The mileage cache is opened and closed by
/// the caller, so one store can serve several exports.
pub struct BillingAggregatorUtil {
    invoice_usecase: InvoiceUsecaseImpl,
}

impl BillingAggregatorUtil {
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            invoice_usecase: InvoiceUsecaseImpl::new(config.invoice_number_base),
        }
    }

    pub async fn from_string<C>(&self, billing_csv: &str, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        C: MileageCacheRepository,
    {
        self.invoice_usecase.from_string(billing_csv, cache).await
    }

    pub async fn from_file<T, C>(&self, billing_csv: T, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        T: AsRef<std::path::Path> + Send,
        C: MileageCacheRepository,
    {
        self.invoice_usecase.from_file(billing_csv, cache).await
    }
}
