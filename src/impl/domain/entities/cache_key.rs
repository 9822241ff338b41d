use crate::{
    domain::logic::normalizer::{normalize_address, normalize_name},
    entities::BillingRow,
};

/// Lookup key of the mileage cache. Fields are always stored normalized, so
/// two rows differing only in spelling of the same street type or in case
/// and spacing map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    last_name: String,
    first_name: String,
    pickup_address: String,
    dropoff_address: String,
}

impl CacheKey {
    pub fn new(
        last_name: &str,
        first_name: &str,
        pickup_address: &str,
        dropoff_address: &str,
    ) -> Self {
        Self {
            last_name: normalize_name(last_name),
            first_name: normalize_name(first_name),
            pickup_address: normalize_address(pickup_address),
            dropoff_address: normalize_address(dropoff_address),
        }
    }

    pub fn from_row(row: &BillingRow) -> Self {
        Self::new(
            &row.last_name,
            &row.first_name,
            &row.pickup_address,
            &row.dropoff_address,
        )
    }

    /// Rebuilds a key from values already read back from the cache table.
    pub(crate) fn from_normalized(
        last_name: String,
        first_name: String,
        pickup_address: String,
        dropoff_address: String,
    ) -> Self {
        Self {
            last_name,
            first_name,
            pickup_address,
            dropoff_address,
        }
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn pickup_address(&self) -> &str {
        &self.pickup_address
    }

    pub fn dropoff_address(&self) -> &str {
        &self.dropoff_address
    }

    /// A key without both addresses cannot be resolved to a distance.
    pub fn is_complete(&self) -> bool {
        !self.pickup_address.is_empty() && !self.dropoff_address.is_empty()
    }
}
