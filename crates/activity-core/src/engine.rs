//! Seam to the external workflow-definition engine.
//!
//! The engine owns workflows, states, transitions, and the state assignment
//! of every subject. This crate only reads the graph and moves the state
//! pointer; it never defines workflows.
//!
//! The definition engine must call [`EndingStateResolver::state_created`],
//! [`EndingStateResolver::transition_attached`], and
//! [`EndingStateResolver::transition_detached`] whenever it edits a workflow
//! graph, so that cached terminality stays correct.
//!
//! [`EndingStateResolver::state_created`]: crate::ending::EndingStateResolver::state_created
//! [`EndingStateResolver::transition_attached`]: crate::ending::EndingStateResolver::transition_attached
//! [`EndingStateResolver::transition_detached`]: crate::ending::EndingStateResolver::transition_detached

use crate::error::Result;
use crate::subject::SubjectRef;
use crate::types::{State, StateId, Transition, UserId, WorkflowName};

pub trait WorkflowEngine: Send + Sync {
    /// Current state of a subject, `None` when it is not managed by any
    /// workflow yet.
    fn current_state(&self, subject: &SubjectRef) -> Result<Option<State>>;

    /// Move the subject's state pointer. The state must belong to the
    /// subject's workflow.
    fn set_state(&self, subject: &SubjectRef, state: &StateId) -> Result<()>;

    /// Put the subject under a workflow, placing it in the workflow's
    /// initial state.
    fn set_workflow(&self, subject: &SubjectRef, workflow: &WorkflowName) -> Result<()>;

    /// Remove the subject's workflow and state assignment. Recorded actions
    /// are untouched.
    fn remove_workflow(&self, subject: &SubjectRef) -> Result<()>;

    /// All states of a workflow. Empty for an unknown workflow name.
    fn workflow_states(&self, workflow: &WorkflowName) -> Result<Vec<State>>;

    /// Outgoing transitions of a state, in definition order.
    fn outgoing_transitions(&self, state: &StateId) -> Result<Vec<Transition>>;

    /// Transitions out of the subject's current state that `user` is allowed
    /// to execute. The engine applies its own permission checks. Empty when
    /// the subject has no current state.
    fn allowed_transitions(&self, subject: &SubjectRef, user: &UserId) -> Result<Vec<Transition>>;
}
