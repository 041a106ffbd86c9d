use thiserror::Error;

use crate::backend::ApiError;
use crate::session::FailureReason;
use crate::validate::ValidationError;

/// The creation request failed, either in transit or because the backend
/// refused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmissionError {
    pub message: String,
}

impl From<ApiError> for SubmissionError {
    fn from(err: ApiError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Why [`JobController::submit`](crate::controller::JobController::submit)
/// produced no handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not start the download: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Download failed: {0}")]
    JobFailed(FailureReason),

    #[error("The audio link expired before it could be saved")]
    ArtifactExpired,

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(e) => AppError::Validation(e),
            SubmitError::Submission(e) => AppError::Submission(e),
        }
    }
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Validation(_) | AppError::Config(_) => 2,
            AppError::Submission(_) | AppError::Api(_) => 3,
            AppError::JobFailed(_) => 4,
            AppError::ArtifactExpired => 5,
            AppError::Interrupted => 130,
            AppError::Io(_) => 1,
        }
    }
}
