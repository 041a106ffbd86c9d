use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{LifecycleState, StateKind};

/// Audio container the backend can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Mp3 => write!(f, "mp3"),
            AudioFormat::M4a => write!(f, "m4a"),
            AudioFormat::Wav => write!(f, "wav"),
        }
    }
}

/// Target bitrate. Serialized as the string the backend expects ("192").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "128")]
    Kbps128,
    #[serde(rename = "192")]
    Kbps192,
    #[serde(rename = "320")]
    Kbps320,
}

impl Quality {
    pub fn kbps(self) -> u32 {
        match self {
            Quality::Kbps128 => 128,
            Quality::Kbps192 => 192,
            Quality::Kbps320 => 320,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} kbps", self.kbps())
    }
}

/// What the user asked for. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: String,
    pub format: AudioFormat,
    pub quality: Quality,
}

/// Identifies one backend job for the lifetime of polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
}

impl JobHandle {
    /// The artifact location is a deterministic function of the job id.
    pub fn artifact(&self) -> ArtifactRef {
        ArtifactRef {
            download_url: format!("/artifact/{}", self.id),
        }
    }
}

/// Reference to the finished audio file. Only usable while the owning
/// session is `Succeeded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub download_url: String,
}

/// Raw job status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Extracting,
    Converting,
    Optimizing,
    Completed,
    Failed,
    /// Anything the client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Human-readable progress text for this status.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Extracting => "Extracting audio",
            JobStatus::Converting => "Converting format",
            JobStatus::Optimizing => "Optimizing quality",
            JobStatus::Completed => "Finished",
            _ => "Processing",
        }
    }
}

/// One point-in-time status reading. A new snapshot replaces the previous
/// one; progress is shown as received, never clamped against history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusSnapshot {
    /// The snapshot a job is assumed to be in right after submission.
    pub fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            progress: 0,
            error: None,
        }
    }
}

/// Why a session ended in `Failed`. Each variant is a distinct reason tag
/// so the presentation layer can tailor its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The creation request was rejected or never reached the backend.
    Submission(String),
    /// A status fetch failed; we lost contact with the job.
    Transport(String),
    /// The backend reported `failed`. The message is shown verbatim.
    Backend(String),
    /// The configured poll budget ran out before a terminal status.
    Stalled { polls: u32 },
}

impl FailureReason {
    pub fn tag(&self) -> &'static str {
        match self {
            FailureReason::Submission(_) => "submission",
            FailureReason::Transport(_) => "transport",
            FailureReason::Backend(_) => "backend",
            FailureReason::Stalled { .. } => "stalled",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Submission(msg) => write!(f, "submission failed: {msg}"),
            FailureReason::Transport(msg) => write!(f, "lost contact with job: {msg}"),
            FailureReason::Backend(msg) => write!(f, "{msg}"),
            FailureReason::Stalled { polls } => {
                write!(f, "job still running after {polls} status checks")
            }
        }
    }
}

/// One submission from `Idle` to a terminal state. Never reused: a new
/// submission always gets a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub request: JobRequest,
    pub handle: Option<JobHandle>,
    pub state: LifecycleState,
    pub state_history: Vec<StateKind>,
    pub polls: u32,
    pub artifact_ttl_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(request: JobRequest, artifact_ttl_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request,
            handle: None,
            state: LifecycleState::Idle,
            state_history: Vec::new(),
            polls: 0,
            artifact_ttl_secs,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Structured summary of a finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub job_id: Option<String>,
    pub url: String,
    pub format: AudioFormat,
    pub quality_kbps: u32,
    pub final_state: StateKind,
    pub state_transitions: Vec<StateKind>,
    pub polls: u32,
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl SessionRecord {
    /// The record ends at the session's last state change.
    pub fn from_session(session: &Session) -> Self {
        let mut transitions = session.state_history.clone();
        transitions.push(session.state.kind());
        let failure = match &session.state {
            LifecycleState::Failed(reason) => Some(format!("{}: {reason}", reason.tag())),
            _ => None,
        };

        Self {
            session_id: session.id,
            job_id: session.handle.as_ref().map(|h| h.id.clone()),
            url: session.request.url.clone(),
            format: session.request.format,
            quality_kbps: session.request.quality.kbps(),
            final_state: session.state.kind(),
            state_transitions: transitions,
            polls: session.polls,
            failure,
            started_at: session.created_at,
            completed_at: session.updated_at,
            duration_ms: (session.updated_at - session.created_at).num_milliseconds(),
        }
    }
}
