//! In-process cancellation of running jobs.
//!
//! The runner registers a [`CancellationToken`] for each job it executes.
//! Cancelling the token drops the handler future at its next await point,
//! which rolls back any open transaction it holds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::common::JobId;

/// Error returned by a handler (or produced by the runner) when a job stops
/// because it was cancelled rather than because it failed.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("job cancelled")]
pub struct JobCancelled;

#[derive(Clone, Default)]
pub struct JobCancellations {
    tokens: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl JobCancellations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token for a job about to run.
    pub fn register(&self, job_id: JobId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.insert(job_id, token.clone());
        token
    }

    pub fn remove(&self, job_id: JobId) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.remove(&job_id);
    }

    /// Cancel a job running in this process. Returns false if it isn't.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        match tokens.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.contains_key(&job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_fires_registered_token() {
        let cancellations = JobCancellations::new();
        let job_id = JobId::new();
        let token = cancellations.register(job_id);

        assert!(cancellations.is_running(job_id));
        assert!(cancellations.cancel(job_id));
        assert!(token.is_cancelled());

        cancellations.remove(job_id);
        assert!(!cancellations.is_running(job_id));
        assert!(!cancellations.cancel(job_id));
    }

    #[test]
    fn clones_share_state() {
        let cancellations = JobCancellations::new();
        let other = cancellations.clone();
        let job_id = JobId::new();
        let token = cancellations.register(job_id);

        assert!(other.cancel(job_id));
        assert!(token.is_cancelled());
    }
}
