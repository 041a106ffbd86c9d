//! Serialized status polling for one job.
//!
//! [`StatusPoller::poll`] fetches, hands the snapshot to a callback, waits
//! the configured interval *after* the fetch completed, and repeats. It
//! stops on a terminal status, on a `Stop` directive, on the first fetch
//! error, or when its [`CancellationToken`] fires.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::{ApiError, JobBackend};
use crate::session::{JobHandle, StatusSnapshot};

/// Fixed delay between the end of one fetch and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// What the snapshot callback wants the poller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDirective {
    Continue,
    Stop,
}

/// How a poll loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    /// A `completed` or `failed` snapshot was delivered.
    Terminal,
    /// The callback returned [`PollDirective::Stop`] on a non-terminal snapshot.
    Stopped,
    /// The cancellation token fired; any in-flight answer was discarded.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PollError {
    /// A fetch failed. Polling never continues past one.
    #[error(transparent)]
    Transport(#[from] ApiError),

    #[error("no terminal status after {polls} polls")]
    Exhausted { polls: u32 },
}

pub struct StatusPoller<'a, B> {
    backend: &'a B,
    interval: Duration,
    max_polls: Option<u32>,
    cancel: CancellationToken,
}

impl<'a, B: JobBackend> StatusPoller<'a, B> {
    pub fn new(backend: &'a B, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            backend,
            interval,
            max_polls: None,
            cancel,
        }
    }

    /// Give up after `max_polls` non-terminal snapshots. `None` polls forever.
    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Poll `handle` until a terminal snapshot, a `Stop`, a fetch error or
    /// cancellation. Snapshots reach `on_snapshot` strictly in fetch order and
    /// no fetch starts before the previous callback has returned.
    pub async fn poll<F>(&self, handle: &JobHandle, mut on_snapshot: F) -> Result<PollEnd, PollError>
    where
        F: FnMut(StatusSnapshot) -> PollDirective,
    {
        let mut polls: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(PollEnd::Cancelled);
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(job_id = %handle.id, "Poll cancelled, discarding in-flight fetch");
                    return Ok(PollEnd::Cancelled);
                }
                result = self.backend.fetch_status(handle) => result,
            };
            polls += 1;

            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(job_id = %handle.id, poll = polls, error = %e, "Status fetch failed");
                    return Err(PollError::Transport(e));
                }
            };

            tracing::debug!(
                job_id = %handle.id,
                poll = polls,
                status = ?snapshot.status,
                progress = snapshot.progress,
                "Status snapshot",
            );

            let terminal = snapshot.status.is_terminal();
            if on_snapshot(snapshot) == PollDirective::Stop {
                return Ok(if terminal {
                    PollEnd::Terminal
                } else {
                    PollEnd::Stopped
                });
            }
            if terminal {
                return Ok(PollEnd::Terminal);
            }
            if self.max_polls.is_some_and(|max| polls >= max) {
                return Err(PollError::Exhausted { polls });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(PollEnd::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
