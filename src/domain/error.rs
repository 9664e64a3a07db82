use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("load job submission failed: {0}")]
    Submission(String),
    #[error("load job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },
    #[error("warehouse error: {0}")]
    Warehouse(String),
    #[error("failed to read destination table: {0}")]
    ReadBack(String),
    #[error("load job {job_id} still running after {waited:?}")]
    Timeout { job_id: String, waited: Duration },
    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestionError {
    /// Input errors will fail the same way on redelivery.
    pub fn is_input_error(&self) -> bool {
        matches!(self, IngestionError::InvalidEvent(_))
    }
}
