use std::collections::HashMap;

use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    domain::logic::normalizer::normalize_address,
    entities::DistanceResolver,
    errors::DistanceUnavailable,
};

/// Fixed table of known driving distances, for offline runs and tests.
/// Addresses are normalized on both insert and lookup, and a pair also
/// answers for the reverse direction unless that direction has its own
/// entry.
#[derive(Debug, Clone, Default)]
pub struct DistanceTable {
    miles: HashMap<(String, String), f64>,
}

impl DistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, from: &str, to: &str, miles: f64) -> Self {
        self.miles
            .insert((normalize_address(from), normalize_address(to)), miles);
        self
    }
}

#[async_trait]
impl DistanceResolver for DistanceTable {
    async fn distance_miles(&self, from: &str, to: &str) -> Result<f64, ServerError> {
        let (from_key, to_key) = (normalize_address(from), normalize_address(to));
        self.miles
            .get(&(from_key.clone(), to_key.clone()))
            .or_else(|| self.miles.get(&(to_key, from_key)))
            .copied()
            .ok_or_else(|| DistanceUnavailable::new(from, to))
    }
}
