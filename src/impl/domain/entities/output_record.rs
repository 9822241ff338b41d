use chrono::NaiveDate;

use super::{
    billing_row::BillingRowId,
    passenger_aggregate::BucketExclusion,
    service_token::SegmentParseError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvoiceNumber(pub u64);

/// One invoice line: a single service item bucket of a single invoice group.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Shared by every record of the same invoice group.
    pub invoice_number: InvoiceNumber,
    pub customer_display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub service_code: String,
    pub modifier: String,
    /// Payer name as it appeared in the export.
    pub payer: String,
    pub normalized_payer: String,
    pub quantity: f64,
    pub cost: f64,
    pub case_worker: Option<String>,
    pub case_worker_email: Option<String>,
    pub client_authorization: Option<String>,
    pub billing_frequency: Option<String>,
    pub service_date_start: Option<NaiveDate>,
    pub service_date_end: Option<NaiveDate>,
    /// Sorted, deduplicated.
    pub order_ids: Vec<String>,
}

/// Everything one billing run produces.
#[derive(Debug, Clone, Default)]
pub struct InvoiceRun {
    pub records: Vec<OutputRecord>,
    /// Dead-mileage quantities left out by payer rules.
    pub exclusions: Vec<BucketExclusion>,
    /// Malformed service text segments that were skipped.
    pub parse_errors: Vec<(BillingRowId, SegmentParseError)>,
}

// --

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
