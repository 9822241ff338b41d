use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fractic_server_error::ServerError;
use tracing::warn;

use crate::entities::{SyncConflictResolver, SyncDecision, SyncPhase};

/// Retries each phase up to `max_retries` times, then continues. The count
/// resets once a phase gives up, so a store closed after a failed open still
/// gets its full set of upload retries.
#[derive(Debug, Default)]
pub struct RetryThenContinue {
    max_retries: usize,
    download_retries: AtomicUsize,
    upload_retries: AtomicUsize,
}

impl RetryThenContinue {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            download_retries: AtomicUsize::new(0),
            upload_retries: AtomicUsize::new(0),
        }
    }

    fn counter(&self, phase: SyncPhase) -> &AtomicUsize {
        match phase {
            SyncPhase::Download => &self.download_retries,
            SyncPhase::Upload => &self.upload_retries,
        }
    }
}

#[async_trait]
impl SyncConflictResolver for RetryThenContinue {
    async fn decide(&self, phase: SyncPhase, error: &ServerError) -> SyncDecision {
        let counter = self.counter(phase);
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.max_retries {
            warn!(%phase, attempt, max_retries = self.max_retries, error = ?error, "retrying remote mirror transfer");
            return SyncDecision::Retry;
        }
        counter.store(0, Ordering::SeqCst);
        warn!(%phase, max_retries = self.max_retries, error = ?error, "giving up on remote mirror transfer");
        SyncDecision::Continue
    }
}
