//! Job trigger and handoff to the tracker.

use std::sync::Arc;

use thiserror::Error;

use crate::data::{JobSubmitter, SubmitError};
use crate::engine::tracker::{JobProgressTracker, SessionCallbacks};
use crate::models::SweepRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Submission(#[from] SubmitError),

    /// Server accepted the request but gave no id to follow.
    #[error("job not properly started: {message}")]
    NotStarted { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReceipt {
    pub test_id: String,
    pub message: String,
    pub total_configurations: u32,
}

pub struct JobLauncher {
    submitter: Arc<dyn JobSubmitter>,
}

impl JobLauncher {
    pub fn new(submitter: Arc<dyn JobSubmitter>) -> Self {
        Self { submitter }
    }

    /// Submit `request` and, once the server hands back an id, start tracking
    /// it. Returns as soon as the submission is acknowledged.
    pub async fn launch(
        &self,
        tracker: &JobProgressTracker,
        request: &SweepRequest,
        callbacks: SessionCallbacks,
    ) -> Result<LaunchReceipt, LaunchError> {
        let response = self.submitter.submit_sweep(request).await.map_err(|e| {
            log::error!("Sweep submission failed: {}", e);
            e
        })?;

        let test_id = match response.test_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                log::error!(
                    "Sweep accepted without a test id ({:?}); not tracking",
                    response.message
                );
                return Err(LaunchError::NotStarted {
                    message: response.message,
                });
            }
        };

        log::info!(
            "Sweep {} accepted: {} configurations",
            test_id,
            response.total_configurations
        );
        tracker.start_session(test_id.clone(), callbacks);

        Ok(LaunchReceipt {
            test_id,
            message: response.message,
            total_configurations: response.total_configurations,
        })
    }
}
