use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    data::repositories::billing_rows_repository_impl::BillingRowsRepositoryImpl,
    domain::{
        logic::{aggregation_engine::AggregationEngine, flattener::Flattener},
        repositories::{
            billing_rows_repository::BillingRowsRepository,
            mileage_cache_repository::MileageCacheRepository,
        },
    },
    entities::{BillingRow, InvoiceRun},
};

#[async_trait]
pub trait InvoiceUsecase: Send + Sync {
    async fn from_string<C>(&self, billing_csv: &str, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        C: MileageCacheRepository;

    async fn from_file<P, C>(&self, billing_csv: P, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
        C: MileageCacheRepository;
}

pub(crate) struct InvoiceUsecaseImpl<
    R1 = BillingRowsRepositoryImpl, // Default.
> where
    R1: BillingRowsRepository + Send + Sync,
{
    billing_rows_repository: R1,
    flattener: Flattener,
}

#[async_trait]
impl<R1> InvoiceUsecase for InvoiceUsecaseImpl<R1>
where
    R1: BillingRowsRepository + Send + Sync,
{
    async fn from_string<C>(&self, billing_csv: &str, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        C: MileageCacheRepository,
    {
        let rows = self.billing_rows_repository.from_string(billing_csv)?;
        self.run(rows, cache).await
    }

    async fn from_file<P, C>(&self, billing_csv: P, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
        C: MileageCacheRepository,
    {
        let rows = self.billing_rows_repository.from_file(billing_csv)?;
        self.run(rows, cache).await
    }
}

impl<R1> InvoiceUsecaseImpl<R1>
where
    R1: BillingRowsRepository + Send + Sync,
{
    async fn run<C>(&self, rows: Vec<BillingRow>, cache: &C) -> Result<InvoiceRun, ServerError>
    where
        C: MileageCacheRepository,
    {
        let result = AggregationEngine::new(cache).process(rows).await?;
        Ok(InvoiceRun {
            records: self.flattener.flatten(&result.aggregates),
            exclusions: result.exclusions,
            parse_errors: result.parse_errors,
        })
    }
}

impl InvoiceUsecaseImpl {
    pub(crate) fn new(invoice_number_base: u64) -> Self {
        Self {
            billing_rows_repository: BillingRowsRepositoryImpl::new(),
            flattener: Flattener::new(invoice_number_base),
        }
    }
}
