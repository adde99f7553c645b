//! In-memory reference backend.
//!
//! `MemoryBackend` implements both collaborator seams that normally live in
//! external systems — the workflow-definition engine and the permission
//! engine — over lock-guarded maps. `MemoryActionStore` is the matching
//! append-only action store. The test suite runs on these; embedders without
//! a database can too.
//!
//! Graph mutators exist only here: the core library never defines workflows.
//! Callers editing a graph are responsible for driving the
//! [`EndingStateResolver`](crate::ending::EndingStateResolver) invalidation
//! hooks.

use crate::action::{Action, ActionStore};
use crate::engine::WorkflowEngine;
use crate::error::{ActivityError, Result};
use crate::permission::Authorizer;
use crate::subject::SubjectRef;
use crate::types::{RoleId, State, StateId, Transition, TransitionId, UserId, WorkflowName};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Graph {
    initial: Option<StateId>,
    states: Vec<StateId>,
}

#[derive(Default)]
struct Inner {
    workflows: HashMap<WorkflowName, Graph>,
    states: HashMap<StateId, State>,
    transitions: HashMap<TransitionId, Transition>,
    outgoing: HashMap<StateId, Vec<TransitionId>>,
    assignments: HashMap<SubjectRef, StateId>,
    roles: HashMap<UserId, Vec<RoleId>>,
    grants: HashSet<(StateId, RoleId, String)>,
}

impl Inner {
    fn current_state(&self, subject: &SubjectRef) -> Option<&State> {
        self.assignments
            .get(subject)
            .and_then(|id| self.states.get(id))
    }

    fn outgoing_transitions(&self, state: &StateId) -> Vec<Transition> {
        self.outgoing
            .get(state)
            .into_iter()
            .flatten()
            .filter_map(|id| self.transitions.get(id).cloned())
            .collect()
    }

    fn has_permission(&self, subject: &SubjectRef, user: &UserId, permission: &str) -> bool {
        let Some(state) = self.assignments.get(subject) else {
            return false;
        };
        self.roles.get(user).is_some_and(|roles| {
            roles
                .iter()
                .any(|role| self.state_grants(state, role, permission))
        })
    }

    fn state_grants(&self, state: &StateId, role: &RoleId, permission: &str) -> bool {
        self.grants
            .contains(&(state.clone(), role.clone(), permission.to_string()))
    }
}

/// In-memory workflow-definition and permission engine.
#[derive(Default)]
pub struct MemoryBackend {
    inner: RwLock<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Graph definition
    // -----------------------------------------------------------------------

    pub fn add_workflow(&self, name: impl Into<WorkflowName>) {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        inner.workflows.entry(name.into()).or_default();
    }

    /// Add a state to a workflow. The first state added becomes the initial
    /// state unless [`set_initial_state`](Self::set_initial_state) says
    /// otherwise.
    pub fn add_state(
        &self,
        workflow: impl Into<WorkflowName>,
        id: impl Into<StateId>,
        name: impl Into<String>,
    ) -> State {
        let workflow = workflow.into();
        let state = State::new(id.into(), name, workflow.clone());
        let mut inner = self.inner.write().expect("backend lock poisoned");
        let graph = inner.workflows.entry(workflow).or_default();
        if graph.initial.is_none() {
            graph.initial = Some(state.id.clone());
        }
        graph.states.push(state.id.clone());
        inner.states.insert(state.id.clone(), state.clone());
        state
    }

    pub fn set_initial_state(&self, workflow: &WorkflowName, state: &StateId) {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        if let Some(graph) = inner.workflows.get_mut(workflow) {
            graph.initial = Some(state.clone());
        }
    }

    /// Register a transition. It takes effect only once attached to a source
    /// state with [`attach_transition`](Self::attach_transition).
    pub fn add_transition(
        &self,
        workflow: impl Into<WorkflowName>,
        id: impl Into<TransitionId>,
        name: impl Into<String>,
        destination: impl Into<StateId>,
        permission: Option<&str>,
    ) -> Transition {
        let transition = Transition::new(id.into(), name, workflow.into(), destination, permission);
        let mut inner = self.inner.write().expect("backend lock poisoned");
        inner
            .transitions
            .insert(transition.id.clone(), transition.clone());
        transition
    }

    pub fn attach_transition(&self, state: &StateId, transition: &TransitionId) {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        let outgoing = inner.outgoing.entry(state.clone()).or_default();
        if !outgoing.contains(transition) {
            outgoing.push(transition.clone());
        }
    }

    pub fn detach_transition(&self, state: &StateId, transition: &TransitionId) {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        if let Some(outgoing) = inner.outgoing.get_mut(state) {
            outgoing.retain(|id| id != transition);
        }
    }

    // -----------------------------------------------------------------------
    // Roles & grants
    // -----------------------------------------------------------------------

    pub fn add_role(&self, user: impl Into<UserId>, role: impl Into<RoleId>) {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        inner.roles.entry(user.into()).or_default().push(role.into());
    }

    /// Grant `permission` to `role` while a subject sits in `state`.
    pub fn grant(&self, state: &StateId, role: &RoleId, permission: &str) {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        inner
            .grants
            .insert((state.clone(), role.clone(), permission.to_string()));
    }
}

impl WorkflowEngine for MemoryBackend {
    fn current_state(&self, subject: &SubjectRef) -> Result<Option<State>> {
        let inner = self.inner.read().expect("backend lock poisoned");
        Ok(inner.current_state(subject).cloned())
    }

    fn set_state(&self, subject: &SubjectRef, state: &StateId) -> Result<()> {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        if !inner.states.contains_key(state) {
            return Err(ActivityError::UnknownState(state.clone()));
        }
        inner.assignments.insert(subject.clone(), state.clone());
        Ok(())
    }

    fn set_workflow(&self, subject: &SubjectRef, workflow: &WorkflowName) -> Result<()> {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        let graph = inner
            .workflows
            .get(workflow)
            .ok_or_else(|| ActivityError::UnknownWorkflow(workflow.clone()))?;
        let initial = graph.initial.clone().ok_or_else(|| {
            ActivityError::Validation(format!("workflow '{workflow}' has no states"))
        })?;
        inner.assignments.insert(subject.clone(), initial);
        Ok(())
    }

    fn remove_workflow(&self, subject: &SubjectRef) -> Result<()> {
        let mut inner = self.inner.write().expect("backend lock poisoned");
        inner.assignments.remove(subject);
        Ok(())
    }

    fn workflow_states(&self, workflow: &WorkflowName) -> Result<Vec<State>> {
        let inner = self.inner.read().expect("backend lock poisoned");
        let states = inner
            .workflows
            .get(workflow)
            .map(|graph| {
                graph
                    .states
                    .iter()
                    .filter_map(|id| inner.states.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(states)
    }

    fn outgoing_transitions(&self, state: &StateId) -> Result<Vec<Transition>> {
        let inner = self.inner.read().expect("backend lock poisoned");
        Ok(inner.outgoing_transitions(state))
    }

    fn allowed_transitions(&self, subject: &SubjectRef, user: &UserId) -> Result<Vec<Transition>> {
        let inner = self.inner.read().expect("backend lock poisoned");
        let Some(state) = inner.current_state(subject) else {
            return Ok(Vec::new());
        };
        let allowed = inner
            .outgoing_transitions(&state.id)
            .into_iter()
            .filter(|transition| match &transition.permission {
                Some(permission) => inner.has_permission(subject, user, permission),
                None => true,
            })
            .collect();
        Ok(allowed)
    }
}

impl Authorizer for MemoryBackend {
    fn has_permission(&self, subject: &SubjectRef, user: &UserId, permission: &str) -> bool {
        let inner = self.inner.read().expect("backend lock poisoned");
        inner.has_permission(subject, user, permission)
    }

    fn state_grants(&self, state: &StateId, role: &RoleId, permission: &str) -> bool {
        let inner = self.inner.read().expect("backend lock poisoned");
        inner.state_grants(state, role, permission)
    }
}

// ---------------------------------------------------------------------------
// MemoryActionStore
// ---------------------------------------------------------------------------

/// Append-only in-memory action store. Insertion order is time order: both
/// timestamps are stamped under the lock at append.
#[derive(Default)]
pub struct MemoryActionStore {
    actions: Mutex<Vec<Action>>,
}

impl MemoryActionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionStore for MemoryActionStore {
    fn append(&self, mut action: Action) -> Result<Action> {
        let mut actions = self.actions.lock().expect("store lock poisoned");
        let now = Utc::now();
        action.process_date = now;
        action.creation_date = now;
        actions.push(action.clone());
        Ok(action)
    }

    fn for_subject(&self, subject: &SubjectRef) -> Result<Vec<Action>> {
        let actions = self.actions.lock().expect("store lock poisoned");
        Ok(actions
            .iter()
            .filter(|action| &action.subject == subject)
            .cloned()
            .collect())
    }

    fn latest_for(&self, subject: &SubjectRef) -> Result<Action> {
        let actions = self.actions.lock().expect("store lock poisoned");
        actions
            .iter()
            .filter(|action| &action.subject == subject)
            .last()
            .cloned()
            .ok_or_else(|| ActivityError::NotFound(subject.clone()))
    }

    fn all(&self) -> Result<Vec<Action>> {
        let actions = self.actions.lock().expect("store lock poisoned");
        Ok(actions.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
