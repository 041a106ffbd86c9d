mod job;
mod state;

pub use job::{
    ArtifactRef, AudioFormat, FailureReason, JobHandle, JobRequest, JobStatus, Quality, Session,
    SessionRecord, StatusSnapshot,
};
pub use state::{LifecycleState, StateKind, StateMachine};
