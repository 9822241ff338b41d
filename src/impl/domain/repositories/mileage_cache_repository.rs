use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::entities::{CacheKey, MileageCacheEntry, MileageCacheEntryId, OverrideUpdate};

/// Find-or-create access to the persistent trip distance cache.
#[async_trait]
pub trait MileageCacheRepository: Send + Sync {
    async fn find_entry(&self, key: &CacheKey) -> Result<Option<MileageCacheEntry>, ServerError>;

    /// Resolves both legs through the distance oracle and persists a new
    /// entry. Oracle failures degrade to the source values.
    async fn create_entry(
        &self,
        key: &CacheKey,
        source_miles: f64,
        source_dead_miles: f64,
    ) -> Result<MileageCacheEntry, ServerError>;

    /// Operator correction. Only the override fields are writable.
    async fn update_override(
        &self,
        id: MileageCacheEntryId,
        update: OverrideUpdate,
    ) -> Result<MileageCacheEntry, ServerError>;

    async fn list_entries(&self) -> Result<Vec<MileageCacheEntry>, ServerError>;

    async fn find_or_create(
        &self,
        key: &CacheKey,
        source_miles: f64,
        source_dead_miles: f64,
    ) -> Result<MileageCacheEntry, ServerError> {
        match self.find_entry(key).await? {
            Some(entry) => Ok(entry),
            None => self.create_entry(key, source_miles, source_dead_miles).await,
        }
    }
}
