use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::job::{ArtifactRef, FailureReason, JobHandle, JobStatus, Session, StatusSnapshot};
use crate::poller::PollDirective;

/// The single authoritative state of a session.
///
/// Each session flows through: IDLE → SUBMITTING → POLLING → SUCCEEDED → EXPIRED,
/// or ends in FAILED from any non-terminal step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Idle,
    Submitting,
    Polling(StatusSnapshot),
    Succeeded {
        artifact: ArtifactRef,
        expires_at: DateTime<Utc>,
    },
    Failed(FailureReason),
    Expired,
}

impl LifecycleState {
    pub fn kind(&self) -> StateKind {
        match self {
            LifecycleState::Idle => StateKind::Idle,
            LifecycleState::Submitting => StateKind::Submitting,
            LifecycleState::Polling(_) => StateKind::Polling,
            LifecycleState::Succeeded { .. } => StateKind::Succeeded,
            LifecycleState::Failed(_) => StateKind::Failed,
            LifecycleState::Expired => StateKind::Expired,
        }
    }

    /// `Failed` and `Expired` admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Failed(_) | LifecycleState::Expired)
    }
}

/// Payload-free discriminant of [`LifecycleState`], kept in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    Expired,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Idle => write!(f, "IDLE"),
            StateKind::Submitting => write!(f, "SUBMITTING"),
            StateKind::Polling => write!(f, "POLLING"),
            StateKind::Succeeded => write!(f, "SUCCEEDED"),
            StateKind::Failed => write!(f, "FAILED"),
            StateKind::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// The result of feeding an event into the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved to a new non-polling state (submitting, or polling just started).
    Advance(StateKind),
    /// Still polling; the snapshot replaced the previous one.
    Continue { label: &'static str, progress: u8 },
    /// The job completed and the artifact is now available.
    Succeed {
        artifact: ArtifactRef,
        expires_at: DateTime<Utc>,
    },
    /// The session failed.
    Fail(FailureReason),
    /// The artifact grace period ran out.
    Expire,
    /// The event does not apply in the current state.
    Ignored,
}

impl Transition {
    /// Whether the poller should keep fetching after this transition.
    pub fn directive(&self) -> PollDirective {
        match self {
            Transition::Continue { .. } => PollDirective::Continue,
            _ => PollDirective::Stop,
        }
    }
}

/// Drives a [`Session`] through its lifecycle. Knows nothing about HTTP.
pub struct StateMachine;

impl StateMachine {
    /// `Idle → Submitting`.
    pub fn submit(session: &mut Session) -> Transition {
        match session.state {
            LifecycleState::Idle => {
                Self::apply(session, LifecycleState::Submitting);
                Transition::Advance(StateKind::Submitting)
            }
            _ => Transition::Ignored,
        }
    }

    /// `Submitting → Polling`, recording the handle the backend gave us.
    pub fn accept(session: &mut Session, handle: JobHandle) -> Transition {
        match session.state {
            LifecycleState::Submitting => {
                session.handle = Some(handle);
                Self::apply(session, LifecycleState::Polling(StatusSnapshot::queued()));
                Transition::Advance(StateKind::Polling)
            }
            _ => Transition::Ignored,
        }
    }

    /// `Submitting → Failed(Submission)`.
    pub fn reject(session: &mut Session, message: String) -> Transition {
        match session.state {
            LifecycleState::Submitting => Self::fail(session, FailureReason::Submission(message)),
            _ => Transition::Ignored,
        }
    }

    /// Reconcile a fresh status snapshot with the current state.
    ///
    /// - Non-terminal statuses keep the session in `Polling` with the new snapshot.
    /// - `completed` moves to `Succeeded`, with the artifact derived from the handle
    ///   and an expiry `artifact_ttl_secs` after `now`.
    /// - `failed` moves to `Failed(Backend)` with the backend's message, or a
    ///   generic one when it sent none.
    /// - Outside `Polling` the snapshot is ignored, so a session can only
    ///   succeed or fail once.
    pub fn observe(session: &mut Session, snapshot: StatusSnapshot, now: DateTime<Utc>) -> Transition {
        if !matches!(session.state, LifecycleState::Polling(_)) {
            return Transition::Ignored;
        }
        session.polls += 1;

        match snapshot.status {
            JobStatus::Completed => {
                let Some(handle) = session.handle.as_ref() else {
                    return Self::fail(
                        session,
                        FailureReason::Transport("completed job has no handle".into()),
                    );
                };
                let artifact = handle.artifact();
                let ttl = i64::try_from(session.artifact_ttl_secs).unwrap_or(i64::MAX);
                let expires_at = now + Duration::seconds(ttl);
                Self::apply(
                    session,
                    LifecycleState::Succeeded {
                        artifact: artifact.clone(),
                        expires_at,
                    },
                );
                Transition::Succeed {
                    artifact,
                    expires_at,
                }
            }
            JobStatus::Failed => {
                let reason = snapshot
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "unknown error".to_string());
                Self::fail(session, FailureReason::Backend(reason))
            }
            status => {
                let progress = snapshot.progress;
                // Replaces the snapshot in place; history records state kinds only.
                session.state = LifecycleState::Polling(snapshot);
                session.updated_at = Utc::now();
                Transition::Continue {
                    label: status.label(),
                    progress,
                }
            }
        }
    }

    /// A status fetch failed: `Polling → Failed(Transport)`.
    pub fn lose_contact(session: &mut Session, message: String) -> Transition {
        match session.state {
            LifecycleState::Polling(_) => Self::fail(session, FailureReason::Transport(message)),
            _ => Transition::Ignored,
        }
    }

    /// The poll budget ran out: `Polling → Failed(Stalled)`.
    pub fn stall(session: &mut Session) -> Transition {
        match session.state {
            LifecycleState::Polling(_) => {
                let polls = session.polls;
                Self::fail(session, FailureReason::Stalled { polls })
            }
            _ => Transition::Ignored,
        }
    }

    /// `Succeeded → Expired`.
    pub fn expire(session: &mut Session) -> Transition {
        match session.state {
            LifecycleState::Succeeded { .. } => {
                Self::apply(session, LifecycleState::Expired);
                Transition::Expire
            }
            _ => Transition::Ignored,
        }
    }

    fn fail(session: &mut Session, reason: FailureReason) -> Transition {
        Self::apply(session, LifecycleState::Failed(reason.clone()));
        Transition::Fail(reason)
    }

    fn apply(session: &mut Session, next: LifecycleState) {
        session.state_history.push(session.state.kind());
        session.state = next;
        session.updated_at = Utc::now();
    }
}
