use fractic_server_error::ServerError;

use crate::entities::BillingRow;

pub trait BillingRowsRepository {
    fn from_string(&self, billing_csv: &str) -> Result<Vec<BillingRow>, ServerError>;

    fn from_file<P>(&self, billing_csv: P) -> Result<Vec<BillingRow>, ServerError>
    where
        P: AsRef<std::path::Path>;
}
