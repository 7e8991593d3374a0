use serde::{Deserialize, Serialize};

use crate::models::job::MediaJob;

/// Result record delivered to the caller's callback URL once a pipeline run
/// finishes. Owned exclusively by the orchestrator for the lifetime of one
/// run and discarded after delivery; nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobOutcome {
    #[serde(rename = "operation_successful")]
    pub success: bool,
    #[serde(
        rename = "output_path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_path: Option<String>,
}

impl JobOutcome {
    /// Optimistic outcome: success until a pipeline stage says otherwise.
    pub fn new(job: &MediaJob) -> Self {
        Self {
            success: true,
            output_path: Some(job.layout.output_path.to_string_lossy().into_owned()),
        }
    }

    /// Once failed there is no output location to report.
    pub fn mark_failed(&mut self) {
        self.success = false;
        self.output_path = None;
    }
}
