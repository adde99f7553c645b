use crate::subject::SubjectRef;
use crate::types::{StateId, TransitionId, WorkflowName};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("no action recorded for {0}")]
    NotFound(SubjectRef),

    #[error("{0} has no current state")]
    NoCurrentState(SubjectRef),

    #[error("unknown workflow: {0}")]
    UnknownWorkflow(WorkflowName),

    #[error("unknown state: {0}")]
    UnknownState(StateId),

    #[error("unknown transition: {0}")]
    UnknownTransition(TransitionId),

    #[error("no default workflow registered for subject kind '{0}'")]
    NoDefaultWorkflow(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ActivityError>;
