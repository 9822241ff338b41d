use fractic_server_error::ServerError;

use crate::{
    data::datasources::billing_csv_datasource::{BillingCsvDatasource, BillingCsvDatasourceImpl},
    domain::repositories::billing_rows_repository::BillingRowsRepository,
    entities::BillingRow,
};

pub(crate) struct BillingRowsRepositoryImpl<DS = BillingCsvDatasourceImpl>
where
    DS: BillingCsvDatasource,
{
    billing_datasource: DS,
}

impl<DS> BillingRowsRepository for BillingRowsRepositoryImpl<DS>
where
    DS: BillingCsvDatasource,
{
    fn from_string(&self, billing_csv: &str) -> Result<Vec<BillingRow>, ServerError> {
        self.billing_datasource.from_string(billing_csv)
    }

    fn from_file<P>(&self, billing_csv: P) -> Result<Vec<BillingRow>, ServerError>
    where
        P: AsRef<std::path::Path>,
    {
        self.billing_datasource.from_file(billing_csv)
    }
}

impl BillingRowsRepositoryImpl<BillingCsvDatasourceImpl> {
    pub(crate) fn new() -> Self {
        BillingRowsRepositoryImpl {
            billing_datasource: BillingCsvDatasourceImpl::new(),
        }
    }
}
