//! Client-side expiry of a finished artifact.
//!
//! [`ArtifactExpiryTimer::start`] counts down once per tick from the given
//! number of seconds to zero, reporting every value, then fires `on_expire`
//! exactly once. The returned [`CancelHandle`] stops it; once
//! [`CancelHandle::cancel`] returns, no callback runs again.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// How long a finished artifact stays usable.
pub const DEFAULT_ARTIFACT_TTL_SECS: u64 = 60;

pub struct ArtifactExpiryTimer {
    tick: Duration,
    token: CancellationToken,
}

impl Default for ArtifactExpiryTimer {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            token: CancellationToken::new(),
        }
    }
}

impl ArtifactExpiryTimer {
    /// A timer that also stops when `parent` is cancelled.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            ..Self::default()
        }
    }

    /// Override the one-second tick.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Start counting down from `duration_secs`.
    ///
    /// `on_tick` sees `duration_secs, duration_secs - 1, ..., 0`, the first
    /// call immediately. Right after the `0` tick `on_expire` runs once and
    /// the timer stops.
    pub fn start<T, E>(self, duration_secs: u64, mut on_tick: T, on_expire: E) -> CancelHandle
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let token = self.token;
        let gate = Arc::new(Mutex::new(()));

        let task = {
            let token = token.clone();
            let gate = Arc::clone(&gate);
            let tick = self.tick;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(tick);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let mut remaining = duration_secs;

                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        _ = ticker.tick() => {}
                    }

                    {
                        // Held while checking and firing so cancel() cannot interleave.
                        let _gate = gate.lock().unwrap_or_else(PoisonError::into_inner);
                        if token.is_cancelled() {
                            return;
                        }
                        on_tick(remaining);
                        if remaining == 0 {
                            on_expire();
                            return;
                        }
                    }
                    remaining -= 1;
                }
            })
        };

        CancelHandle { token, gate, task }
    }
}

/// Stops a running [`ArtifactExpiryTimer`].
pub struct CancelHandle {
    token: CancellationToken,
    gate: Arc<Mutex<()>>,
    task: JoinHandle<()>,
}

impl CancelHandle {
    /// Stop all future ticks. `on_expire` will not fire after this returns,
    /// even if the final tick is due at the same instant.
    pub fn cancel(&self) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the timer has expired or been cancelled.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Expiry timer task ended abnormally");
        }
    }
}
