use chrono::{DateTime, Utc};

use super::cache_key::CacheKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MileageCacheEntryId(pub i64);

/// Persistent distance record for one (passenger, pickup, dropoff) trip.
///
/// Source and resolved values are written once at creation. Only the
/// override fields change afterwards, and only through an operator
/// correction.
#[derive(Debug, Clone, PartialEq)]
pub struct MileageCacheEntry {
    pub id: MileageCacheEntryId,
    pub key: CacheKey,
    /// Miles reported by the scheduling export.
    pub source_miles: f64,
    /// Miles returned by the distance oracle (or the source value, if the
    /// oracle was unavailable at creation).
    pub resolved_miles: f64,
    pub override_miles: Option<f64>,
    pub source_dead_miles: f64,
    pub resolved_dead_miles: f64,
    pub override_dead_miles: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The operator-writable subset of an entry. `None` clears the override.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverrideUpdate {
    pub override_miles: Option<f64>,
    pub override_dead_miles: Option<f64>,
}

/// Metadata object travelling alongside the persisted cache file.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSyncMetadata {
    pub version: u64,
    pub last_sync: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub file_size: u64,
}

/// How a cache store session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Database and metadata were uploaded.
    Synced(CacheSyncMetadata),
    /// The store was opened local-only; nothing was uploaded.
    NotSynced,
    /// Upload failed and the operator chose to close anyway.
    ClosedWithoutBackup,
    /// Upload failed and the operator aborted. The store is still open and
    /// `close` may be called again.
    Aborted,
}

// --

impl MileageCacheEntry {
    /// Trip miles by priority override > resolved > source, rounded to the
    /// nearest whole mile.
    pub fn resolved_mileage(&self) -> i64 {
        Self::prioritized(self.override_miles, self.resolved_miles, self.source_miles)
    }

    /// Dead miles by the same priority as `resolved_mileage`.
    pub fn resolved_dead_mileage(&self) -> i64 {
        Self::prioritized(
            self.override_dead_miles,
            self.resolved_dead_miles,
            self.source_dead_miles,
        )
    }

    pub fn has_mileage_override(&self) -> bool {
        self.override_miles.is_some()
    }

    pub fn has_dead_mileage_override(&self) -> bool {
        self.override_dead_miles.is_some()
    }

    fn prioritized(override_value: Option<f64>, resolved: f64, source: f64) -> i64 {
        let value = override_value
            .or(Some(resolved).filter(|v| v.is_finite()))
            .unwrap_or(source);
        value.round() as i64
    }
}

impl CacheSyncMetadata {
    /// Metadata for the next upload following `previous` (if any).
    pub fn next(
        previous: Option<&CacheSyncMetadata>,
        last_modified: DateTime<Utc>,
        file_size: u64,
    ) -> Self {
        Self {
            version: previous.map(|m| m.version + 1).unwrap_or(1),
            last_sync: Utc::now(),
            last_modified,
            file_size,
        }
    }
}
