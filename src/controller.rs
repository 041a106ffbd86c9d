use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::JobBackend;
use crate::config::AppConfig;
use crate::error::{SubmissionError, SubmitError};
use crate::poller::{DEFAULT_POLL_INTERVAL, PollEnd, PollError, StatusPoller};
use crate::session::{ArtifactRef, JobHandle, JobRequest, LifecycleState, Session, StateMachine};
use crate::timer::{ArtifactExpiryTimer, DEFAULT_ARTIFACT_TTL_SECS};
use crate::validate::{extract_video_id, validate_url};

/// Timing knobs for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub poll_interval: Duration,
    pub artifact_ttl_secs: u64,
    /// Length of one countdown step of the expiry timer.
    pub tick: Duration,
    /// Fail a job that is still running after this many status checks.
    pub max_polls: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            artifact_ttl_secs: DEFAULT_ARTIFACT_TTL_SECS,
            tick: Duration::from_secs(1),
            max_polls: None,
        }
    }
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            artifact_ttl_secs: config.artifact_ttl_secs,
            max_polls: config.max_polls,
            ..Self::default()
        }
    }
}

/// What the presentation layer reads: the active session's state plus the
/// expiry countdown while an artifact is available.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session_id: Option<Uuid>,
    pub state: LifecycleState,
    pub remaining_secs: Option<u64>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            session_id: None,
            state: LifecycleState::Idle,
            remaining_secs: None,
        }
    }
}

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<Session>,
    // Cancels the session if the controller is dropped without abandon().
    _guard: DropGuard,
}

/// Owns at most one job session at a time and publishes its state.
///
/// A new [`submit`](Self::submit) first cancels the running session (poller
/// and expiry timer) and waits for it to stop, so two sessions never emit
/// state at the same time.
pub struct JobController<B> {
    backend: Arc<B>,
    config: SessionConfig,
    view: Arc<watch::Sender<SessionView>>,
    active: Option<ActiveSession>,
    finished: Option<Session>,
}

impl<B: JobBackend> JobController<B> {
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            backend,
            config,
            view: Arc::new(view),
            active: None,
            finished: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// The artifact, but only while the session is `Succeeded`.
    pub fn artifact(&self) -> Option<ArtifactRef> {
        match &self.view.borrow().state {
            LifecycleState::Succeeded { artifact, .. } => Some(artifact.clone()),
            _ => None,
        }
    }

    /// Start a new session for `request`.
    ///
    /// Invalid input is rejected without touching the current session.
    /// Otherwise the current session is cancelled and joined, the state resets
    /// to `Idle → Submitting`, and exactly one creation request is sent. On
    /// success polling starts in the background.
    pub async fn submit(&mut self, request: JobRequest) -> Result<JobHandle, SubmitError> {
        let url = validate_url(&request.url)?;
        let request = JobRequest { url, ..request };

        self.abandon().await;
        self.finished = None;

        let mut session = Session::new(request, self.config.artifact_ttl_secs);
        publish(&self.view, &session, None);

        StateMachine::submit(&mut session);
        publish(&self.view, &session, None);
        tracing::info!(
            session_id = %session.id,
            url = %session.request.url,
            video_id = extract_video_id(&session.request.url).unwrap_or("-"),
            format = %session.request.format,
            quality = session.request.quality.kbps(),
            "Submitting job",
        );

        let handle = match self.backend.submit_job(&session.request).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = SubmissionError::from(e);
                tracing::warn!(session_id = %session.id, error = %err, "Submission failed");
                StateMachine::reject(&mut session, err.message.clone());
                publish(&self.view, &session, None);
                self.finished = Some(session);
                return Err(err.into());
            }
        };

        StateMachine::accept(&mut session, handle.clone());
        publish(&self.view, &session, None);
        tracing::info!(session_id = %session.id, job_id = %handle.id, "Job accepted, polling");

        let id = session.id;
        let cancel = CancellationToken::new();
        let span = tracing::info_span!("session", session_id = %id, job_id = %handle.id);
        let task = tokio::spawn(
            drive(
                Arc::clone(&self.backend),
                session,
                self.config.clone(),
                Arc::clone(&self.view),
                cancel.clone(),
            )
            .instrument(span),
        );
        self.active = Some(ActiveSession {
            id,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        });

        Ok(handle)
    }

    /// Cancel the running session, if any, and wait for its poller and timer
    /// to stop. Returns the session as it stood when it stopped.
    pub async fn abandon(&mut self) -> Option<&Session> {
        if let Some(active) = &self.active {
            tracing::debug!(session_id = %active.id, "Cancelling session");
            active.cancel.cancel();
        }
        self.join().await
    }

    /// Wait for the running session to end on its own: failed, expired, or
    /// cancelled elsewhere.
    pub async fn wait(&mut self) -> Option<&Session> {
        self.join().await
    }

    async fn join(&mut self) -> Option<&Session> {
        if let Some(active) = self.active.take() {
            match active.task.await {
                Ok(session) => self.finished = Some(session),
                Err(e) => {
                    tracing::error!(session_id = %active.id, error = %e, "Session task panicked");
                }
            }
        }
        self.finished.as_ref()
    }
}

/// Poll one job to a terminal state, then run the artifact countdown.
async fn drive<B: JobBackend>(
    backend: Arc<B>,
    mut session: Session,
    config: SessionConfig,
    view: Arc<watch::Sender<SessionView>>,
    cancel: CancellationToken,
) -> Session {
    let Some(handle) = session.handle.clone() else {
        return session;
    };

    let poller = StatusPoller::new(backend.as_ref(), config.poll_interval, cancel.clone())
        .with_max_polls(config.max_polls);
    let result = poller
        .poll(&handle, |snapshot| {
            let transition = StateMachine::observe(&mut session, snapshot, Utc::now());
            publish(&view, &session, None);
            transition.directive()
        })
        .await;

    match result {
        Ok(PollEnd::Cancelled) => {
            tracing::info!("Session cancelled while polling");
            return session;
        }
        Ok(_) => {}
        Err(PollError::Transport(e)) => {
            StateMachine::lose_contact(&mut session, e.to_string());
            publish(&view, &session, None);
            return session;
        }
        Err(PollError::Exhausted { polls }) => {
            tracing::warn!(polls, "Job did not finish within the poll budget");
            StateMachine::stall(&mut session);
            publish(&view, &session, None);
            return session;
        }
    }

    let ready = match &session.state {
        LifecycleState::Succeeded {
            artifact,
            expires_at,
        } => {
            tracing::info!(
                artifact = %artifact.download_url,
                expires_at = %expires_at,
                "Artifact ready",
            );
            true
        }
        LifecycleState::Failed(reason) => {
            tracing::warn!(reason = reason.tag(), error = %reason, "Job failed");
            false
        }
        _ => false,
    };
    if !ready {
        return session;
    }

    let (expired_tx, expired_rx) = oneshot::channel();
    let tick_view = Arc::clone(&view);
    let session_id = session.id;
    let timer = ArtifactExpiryTimer::child_of(&cancel)
        .with_tick(config.tick)
        .start(
            session.artifact_ttl_secs,
            move |remaining| {
                tick_view.send_if_modified(|v| {
                    if v.session_id != Some(session_id) {
                        return false;
                    }
                    v.remaining_secs = Some(remaining);
                    true
                });
            },
            move || {
                let _ = expired_tx.send(());
            },
        );

    tokio::select! {
        _ = cancel.cancelled() => {
            timer.cancel();
            tracing::info!("Session cancelled before the artifact expired");
        }
        expired = expired_rx => {
            if expired.is_ok() {
                StateMachine::expire(&mut session);
                publish(&view, &session, None);
                tracing::info!("Artifact expired");
            }
        }
    }
    tracing::debug!(cancelled = timer.is_cancelled(), "Waiting for expiry timer to stop");
    timer.finished().await;

    session
}

fn publish(view: &watch::Sender<SessionView>, session: &Session, remaining_secs: Option<u64>) {
    view.send_replace(SessionView {
        session_id: Some(session.id),
        state: session.state.clone(),
        remaining_secs,
    });
}
