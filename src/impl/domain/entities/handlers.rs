use async_trait::async_trait;
use fractic_server_error::ServerError;

// External collaborators.
// ---

/// Driving-distance oracle. Only consulted when the mileage cache misses.
#[async_trait]
pub trait DistanceResolver: Send + Sync {
    /// Driving distance in miles between two addresses.
    async fn distance_miles(&self, from: &str, to: &str) -> Result<f64, ServerError>;
}

/// Remote object store mirroring the cache database.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Returns `Ok(None)` if the object does not exist yet.
    async fn download(&self, object: &str) -> Result<Option<Vec<u8>>, ServerError>;

    async fn upload(&self, object: &str, bytes: Vec<u8>) -> Result<(), ServerError>;
}

// Synchronization decisions.
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Download,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Attempt the same transfer again.
    Retry,
    /// Proceed without the remote copy. On download this marks the store
    /// local-only; on upload this closes the store without a backup.
    Continue,
    /// On download, open fails. On upload, the store stays open.
    Abort,
}

/// Asked whenever the remote mirror cannot be reached.
#[async_trait]
pub trait SyncConflictResolver: Send + Sync {
    async fn decide(&self, phase: SyncPhase, error: &ServerError) -> SyncDecision;
}

// --

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Download => write!(f, "download"),
            SyncPhase::Upload => write!(f, "upload"),
        }
    }
}
