pub mod client;
pub mod error;
#[cfg(test)]
pub mod scripted;
pub mod types;

use std::future::Future;

pub use client::{BackendClient, DEFAULT_SERVER_URL};
pub use error::ApiError;
pub use types::{FormatCatalog, VideoInfo};

use crate::session::{JobHandle, JobRequest, StatusSnapshot};

/// The two backend calls the job lifecycle depends on. Implemented by
/// [`BackendClient`] and by scripted backends in tests.
pub trait JobBackend: Send + Sync + 'static {
    /// Create a job. Exactly one request, no retries.
    fn submit_job(
        &self,
        request: &JobRequest,
    ) -> impl Future<Output = Result<JobHandle, ApiError>> + Send;

    /// Fetch the current status of a job.
    fn fetch_status(
        &self,
        handle: &JobHandle,
    ) -> impl Future<Output = Result<StatusSnapshot, ApiError>> + Send;
}
