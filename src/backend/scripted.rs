//! In-memory [`JobBackend`] that plays back a per-job script of status
//! answers. Test-only.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{ApiError, JobBackend};
use crate::session::{JobHandle, JobRequest, JobStatus, StatusSnapshot};

/// One scripted answer to a status fetch.
#[derive(Debug, Clone)]
pub enum Step {
    Snapshot(StatusSnapshot),
    /// The fetch fails at the transport layer.
    Drop(String),
    /// The fetch never completes.
    Hang,
}

impl Step {
    pub fn status(status: JobStatus, progress: u8) -> Self {
        Step::Snapshot(StatusSnapshot {
            status,
            progress,
            error: None,
        })
    }

    pub fn failed(error: &str) -> Self {
        Step::Snapshot(StatusSnapshot {
            status: JobStatus::Failed,
            progress: 0,
            error: Some(error.to_string()),
        })
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    submissions: Mutex<VecDeque<Result<String, String>>>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fetch_log: Mutex<Vec<String>>,
    submit_count: Mutex<usize>,
    fetch_delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every status answer, simulating a slow network.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Queue the answer to the next submission: `Ok(id)` or `Err(message)`.
    pub fn on_submit(self, result: Result<&str, &str>) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string).map_err(str::to_string));
        self
    }

    /// Script the status answers for one job. Once the script runs out the
    /// job reports `queued` forever.
    pub fn script(self, id: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into());
        self
    }

    /// Job ids of every status fetch issued so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        *self.submit_count.lock().unwrap()
    }
}

impl JobBackend for ScriptedBackend {
    async fn submit_job(&self, _request: &JobRequest) -> Result<JobHandle, ApiError> {
        *self.submit_count.lock().unwrap() += 1;
        let next = self.submissions.lock().unwrap().pop_front();
        match next {
            Some(Ok(id)) => Ok(JobHandle { id }),
            Some(Err(message)) => Err(ApiError::Rejected(message)),
            None => Err(ApiError::Rejected("no scripted submission".into())),
        }
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusSnapshot, ApiError> {
        self.fetch_log.lock().unwrap().push(handle.id.clone());
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&handle.id)
            .and_then(VecDeque::pop_front);

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        match step {
            Some(Step::Snapshot(snapshot)) => Ok(snapshot),
            Some(Step::Drop(message)) => Err(ApiError::Status {
                status: 503,
                message,
            }),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(StatusSnapshot::queued()),
        }
    }
}
