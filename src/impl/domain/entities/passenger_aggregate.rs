use std::collections::BTreeSet;

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};

use super::{billing_row::BillingRowId, service_token::SegmentParseError};

/// One invoice group: the same passenger may appear under several
/// authorizations in a run, and each combination is invoiced separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassengerAggregateKey {
    pub first_name: String,
    pub last_name: String,
    pub client_authorization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceItemKey {
    pub service_code: String,
    pub modifier: String,
    pub normalized_payer: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceItemBucket {
    pub quantity: f64,
    pub cost: f64,
    pub order_ids: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct PassengerAggregate {
    pub display_name: String,
    pub case_worker: Option<String>,
    pub case_worker_email: Option<String>,
    pub billing_frequency: Option<String>,
    pub first_service_date: Option<NaiveDate>,
    pub last_service_date: Option<NaiveDate>,
    /// Distinct payer names as they appeared in the export, first-seen order.
    pub original_payers: IndexSet<String>,
    pub buckets: IndexMap<ServiceItemKey, ServiceItemBucket>,
}

/// Why a contribution was deliberately left out of its bucket. These are
/// business decisions, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Dead mileage is not billable to this payer.
    DeadMileagePayerNotEligible,
    /// Dead mileage is billable to this payer only above a distance threshold.
    DeadMileageBelowThreshold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketExclusion {
    pub row: BillingRowId,
    pub key: PassengerAggregateKey,
    pub item: ServiceItemKey,
    pub quantity: f64,
    pub reason: ExclusionReason,
}

#[derive(Debug, Default)]
pub struct AggregationResult {
    pub aggregates: IndexMap<PassengerAggregateKey, PassengerAggregate>,
    pub exclusions: Vec<BucketExclusion>,
    pub parse_errors: Vec<(BillingRowId, SegmentParseError)>,
}

// --

impl ServiceItemBucket {
    pub(crate) fn accumulate(&mut self, quantity: f64, cost: f64, order_id: Option<&str>) {
        self.quantity += quantity;
        self.cost += cost;
        if let Some(order_id) = order_id {
            self.order_ids.insert(order_id.to_string());
        }
    }
}

impl PassengerAggregate {
    pub(crate) fn new(display_name: String) -> Self {
        Self {
            display_name,
            case_worker: None,
            case_worker_email: None,
            billing_frequency: None,
            first_service_date: None,
            last_service_date: None,
            original_payers: IndexSet::new(),
            buckets: IndexMap::new(),
        }
    }

    pub(crate) fn observe_service_date(&mut self, date: NaiveDate) {
        self.first_service_date = Some(match self.first_service_date {
            Some(d) => d.min(date),
            None => date,
        });
        self.last_service_date = Some(match self.last_service_date {
            Some(d) => d.max(date),
            None => date,
        });
    }

    pub(crate) fn bucket_mut(&mut self, item: ServiceItemKey) -> &mut ServiceItemBucket {
        self.buckets.entry(item).or_default()
    }
}
