use async_trait::async_trait;
use fractic_server_error::ServerError;
use tracing::warn;

use crate::entities::{SyncConflictResolver, SyncDecision, SyncPhase};

/// Never retries and never aborts. Suited to unattended runs where a
/// missing backup is preferable to a blocked billing cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

#[async_trait]
impl SyncConflictResolver for AlwaysContinue {
    async fn decide(&self, phase: SyncPhase, error: &ServerError) -> SyncDecision {
        warn!(%phase, error = ?error, "remote mirror unavailable, continuing");
        SyncDecision::Continue
    }
}
