//! The managed-instance capability and the service context exposing it.
//!
//! Any domain type opts in by implementing [`Managed`]; all workflow-aware
//! operations live on [`ActivityContext`], which owns the collaborator seams
//! for the lifetime of the process (or request scope) it serves.

use crate::action::{Action, ActionLog, ActionStore};
use crate::ending::EndingStateResolver;
use crate::engine::WorkflowEngine;
use crate::error::{ActivityError, Result};
use crate::executor::{StateChangeSubscriber, TransitionExecutor};
use crate::permission::{Authorizer, PermissionGate};
use crate::query::ManagedQuery;
use crate::subject::{SubjectRef, SubjectRegistry};
use crate::types::{State, Transition, TransitionId, UserId, WorkflowName};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Managed
// ---------------------------------------------------------------------------

/// Capability trait for domain objects whose lifecycle is tracked by a
/// workflow. Implementors only describe themselves; the state pointer lives
/// in the workflow engine and the history lives in the action store.
pub trait Managed {
    /// Tagged reference identifying this object across the core.
    fn subject_ref(&self) -> SubjectRef;

    /// User who initiated the workflow on this object, if any.
    fn initializer(&self) -> Option<&UserId> {
        None
    }

    /// When the object was created. Set once, never mutated.
    fn created_at(&self) -> DateTime<Utc>;
}

// ---------------------------------------------------------------------------
// ActivityContext
// ---------------------------------------------------------------------------

/// Long-lived service wiring the workflow engine, permission engine, action
/// store, ending-state resolver, and transition executor together.
///
/// The built-in [`ActionLog`] subscriber is registered first, so the audit
/// record is appended before any additional subscriber runs.
pub struct ActivityContext {
    engine: Arc<dyn WorkflowEngine>,
    store: Arc<dyn ActionStore>,
    resolver: EndingStateResolver,
    gate: PermissionGate,
    executor: TransitionExecutor,
    registry: SubjectRegistry,
}

impl ActivityContext {
    pub fn new(
        engine: Arc<dyn WorkflowEngine>,
        authorizer: Arc<dyn Authorizer>,
        store: Arc<dyn ActionStore>,
    ) -> Self {
        let resolver = EndingStateResolver::new(engine.clone());
        let mut executor = TransitionExecutor::new(engine.clone());
        executor.subscribe(Box::new(ActionLog::new(store.clone())));
        Self {
            engine,
            store,
            resolver,
            gate: PermissionGate::new(authorizer),
            executor,
            registry: SubjectRegistry::new(),
        }
    }

    pub fn with_registry(mut self, registry: SubjectRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register an additional state-change subscriber. Runs after the
    /// built-in action log, in registration order.
    pub fn with_subscriber(mut self, subscriber: Box<dyn StateChangeSubscriber>) -> Self {
        self.executor.subscribe(subscriber);
        self
    }

    pub fn resolver(&self) -> &EndingStateResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Workflow assignment
    // -----------------------------------------------------------------------

    /// Put an object under a workflow, if it is not managed yet. With no
    /// explicit workflow, the registry's default for the object's kind is
    /// used. Already-managed objects are left untouched.
    pub fn initiate(&self, m: &dyn Managed, workflow: Option<&WorkflowName>) -> Result<()> {
        let subject = m.subject_ref();
        if self.engine.current_state(&subject)?.is_some() {
            return Ok(());
        }
        let workflow = match workflow {
            Some(workflow) => workflow.clone(),
            None => self
                .registry
                .default_workflow(&subject.kind)
                .cloned()
                .ok_or_else(|| ActivityError::NoDefaultWorkflow(subject.kind.to_string()))?,
        };
        self.engine.set_workflow(&subject, &workflow)
    }

    /// Take an object out of its workflow entirely. Its recorded actions
    /// are kept.
    pub fn remove_workflow(&self, m: &dyn Managed) -> Result<()> {
        self.engine.remove_workflow(&m.subject_ref())
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn current_state(&self, m: &dyn Managed) -> Result<Option<State>> {
        self.engine.current_state(&m.subject_ref())
    }

    /// Execute a transition on an object and record it. See
    /// [`TransitionExecutor::change_state`] for the failure contract.
    pub fn change_state(
        &self,
        m: &dyn Managed,
        transition: &Transition,
        actor: Option<&UserId>,
    ) -> Result<()> {
        self.executor
            .change_state(&m.subject_ref(), transition, actor)
    }

    /// An object is editable while it has a current state that is not an
    /// ending state of its workflow.
    pub fn is_editable(&self, m: &dyn Managed) -> Result<bool> {
        match self.current_state(m)? {
            Some(state) => {
                let ending = self.resolver.ending_states(&state.workflow)?;
                Ok(!ending.contains(&state.id))
            }
            None => Ok(false),
        }
    }

    /// Editable, and the user holds `permission` on the object.
    pub fn is_editable_by(&self, m: &dyn Managed, user: &UserId, permission: &str) -> Result<bool> {
        Ok(self.is_editable(m)?
            && self
                .gate
                .has_permission(&m.subject_ref(), Some(user), permission))
    }

    pub fn allowed_transitions(&self, m: &dyn Managed, user: &UserId) -> Result<Vec<Transition>> {
        self.engine.allowed_transitions(&m.subject_ref(), user)
    }

    /// The allowed transition with the given id, or `None` when the user may
    /// not execute it (or it does not leave the current state).
    pub fn allowed_transition(
        &self,
        m: &dyn Managed,
        transition: &TransitionId,
        user: &UserId,
    ) -> Result<Option<Transition>> {
        Ok(self
            .allowed_transitions(m, user)?
            .into_iter()
            .find(|candidate| &candidate.id == transition))
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Full action history of an object, oldest first.
    pub fn actions(&self, m: &dyn Managed) -> Result<Vec<Action>> {
        self.store.for_subject(&m.subject_ref())
    }

    /// Most recent action. Errors with [`ActivityError::NotFound`] when the
    /// object has no history yet.
    pub fn last_action(&self, m: &dyn Managed) -> Result<Action> {
        self.store.latest_for(&m.subject_ref())
    }

    pub fn last_actor(&self, m: &dyn Managed) -> Result<Option<UserId>> {
        Ok(self.maybe_last_action(m)?.and_then(|action| action.actor))
    }

    pub fn last_transition(&self, m: &dyn Managed) -> Result<Option<Transition>> {
        Ok(self.maybe_last_action(m)?.map(|action| action.transition))
    }

    /// State the object was in before its most recent transition.
    pub fn last_state(&self, m: &dyn Managed) -> Result<Option<State>> {
        Ok(self
            .maybe_last_action(m)?
            .map(|action| action.previous_state))
    }

    fn maybe_last_action(&self, m: &dyn Managed) -> Result<Option<Action>> {
        match self.last_action(m) {
            Ok(action) => Ok(Some(action)),
            Err(ActivityError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Materialize the object an action points at, via the registry.
    pub fn resolve_subject(&self, action: &Action) -> Option<Arc<dyn Any + Send + Sync>> {
        self.registry.resolve(&action.subject)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Composable query over a set of managed instances. Source order is
    /// preserved through every filter.
    pub fn query<'a, M: Managed>(&'a self, items: &'a [M]) -> ManagedQuery<'a, M> {
        ManagedQuery::new(self, items)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
