use indexmap::IndexMap;

use crate::{
    domain::logic::payer_rules::normalize_payer,
    entities::{InvoiceNumber, OutputRecord, PassengerAggregate, PassengerAggregateKey},
};

/// Turns aggregated buckets into numbered invoice lines.
pub struct Flattener {
    invoice_number_base: u64,
}

impl Flattener {
    pub fn new(invoice_number_base: u64) -> Self {
        Self {
            invoice_number_base,
        }
    }

    /// One record per bucket, groups in first-seen order. Every record of a
    /// group shares that group's invoice number; numbers increase by one per
    /// group.
    pub fn flatten(
        &self,
        aggregates: &IndexMap<PassengerAggregateKey, PassengerAggregate>,
    ) -> Vec<OutputRecord> {
        aggregates
            .iter()
            .enumerate()
            .flat_map(|(i, (key, aggregate))| {
                let invoice_number = InvoiceNumber(self.invoice_number_base + i as u64);
                aggregate.buckets.iter().map(move |(item, bucket)| OutputRecord {
                    invoice_number,
                    customer_display_name: aggregate.display_name.clone(),
                    first_name: key.first_name.clone(),
                    last_name: key.last_name.clone(),
                    service_code: item.service_code.clone(),
                    modifier: item.modifier.clone(),
                    payer: original_payer(aggregate, &item.normalized_payer),
                    normalized_payer: item.normalized_payer.clone(),
                    quantity: bucket.quantity,
                    cost: bucket.cost,
                    case_worker: aggregate.case_worker.clone(),
                    case_worker_email: aggregate.case_worker_email.clone(),
                    client_authorization: key.client_authorization.clone(),
                    billing_frequency: aggregate.billing_frequency.clone(),
                    service_date_start: aggregate.first_service_date,
                    service_date_end: aggregate.last_service_date,
                    order_ids: bucket.order_ids.iter().cloned().collect(),
                })
            })
            .collect()
    }
}

/// Recovers the export's spelling of a payer from its normalized form. Falls
/// back to the normalized form if no tracked original matches.
fn original_payer(aggregate: &PassengerAggregate, normalized_payer: &str) -> String {
    aggregate
        .original_payers
        .iter()
        .find(|original| normalize_payer(original) == normalized_payer)
        .cloned()
        .unwrap_or_else(|| normalized_payer.to_string())
}
