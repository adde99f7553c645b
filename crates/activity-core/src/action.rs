//! The append-only audit log.
//!
//! One `Action` is recorded per observed transition. Actions are immutable:
//! nothing in this crate updates or deletes a record once appended.

use crate::error::Result;
use crate::executor::{StateChangeSubscriber, StateChanged};
use crate::subject::SubjectRef;
use crate::types::{State, Transition, UserId, WorkflowName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Immutable record of one transition performed on a managed subject.
///
/// `previous_state` is the state the subject was in before the transition;
/// `workflow` is denormalized from it for query convenience. Both timestamps
/// are stamped by the store at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    /// `None` for system-initiated transitions.
    pub actor: Option<UserId>,
    pub transition: Transition,
    pub previous_state: State,
    pub workflow: WorkflowName,
    pub subject: SubjectRef,
    pub process_date: DateTime<Utc>,
    pub creation_date: DateTime<Utc>,
}

impl Action {
    /// Build the record for a state-change event. Timestamps are placeholder
    /// values until the store stamps them.
    fn from_event(event: &StateChanged) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            actor: event.actor.clone(),
            transition: event.transition.clone(),
            workflow: event.previous_state.workflow.clone(),
            previous_state: event.previous_state.clone(),
            subject: event.subject.clone(),
            process_date: now,
            creation_date: now,
        }
    }

    /// Name to display for the actor; system-initiated actions render as
    /// "auto".
    pub fn actor_label(&self) -> &str {
        self.actor.as_ref().map_or("auto", UserId::as_str)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} - {}",
            self.subject,
            self.workflow,
            self.actor_label(),
            self.transition
        )
    }
}

// ---------------------------------------------------------------------------
// ActionStore
// ---------------------------------------------------------------------------

/// Persistence seam for actions. Append-only: implementations must not
/// expose updates or deletes.
pub trait ActionStore: Send + Sync {
    /// Persist an action, stamping `process_date` and `creation_date` with
    /// the store's clock. Returns the stamped record.
    fn append(&self, action: Action) -> Result<Action>;

    /// All actions for a subject, ascending by `process_date`.
    fn for_subject(&self, subject: &SubjectRef) -> Result<Vec<Action>>;

    /// Most recent action for a subject, by `process_date`. Errors with
    /// [`ActivityError::NotFound`](crate::ActivityError::NotFound) when the
    /// subject has no actions.
    fn latest_for(&self, subject: &SubjectRef) -> Result<Action>;

    /// Every recorded action, ascending by `process_date`.
    fn all(&self) -> Result<Vec<Action>>;
}

// ---------------------------------------------------------------------------
// ActionLog
// ---------------------------------------------------------------------------

/// Built-in subscriber that appends one action per state-change event.
pub struct ActionLog {
    store: Arc<dyn ActionStore>,
}

impl ActionLog {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self { store }
    }
}

impl StateChangeSubscriber for ActionLog {
    fn on_state_changed(&self, event: &StateChanged) -> Result<()> {
        let action = self.store.append(Action::from_event(event))?;
        tracing::debug!(action = %action, "recorded action");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
