//! Terminal-state resolution.
//!
//! A state is terminal ("ending") iff it has no outgoing transitions. The
//! resolver computes the terminal set of a workflow on first request and
//! caches it per workflow name; the workflow-definition component must call
//! the invalidation methods whenever it edits a graph.

use crate::engine::WorkflowEngine;
use crate::error::Result;
use crate::types::{StateId, WorkflowName};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Computes and caches the set of ending states per workflow.
///
/// The cache is keyed by workflow name. Names are unique identifiers in the
/// definition engine, so name keying is identity keying. Cached sets are
/// `Arc`-wrapped and replaced wholesale: concurrent readers see either the
/// pre- or post-invalidation set, never a partial one.
pub struct EndingStateResolver {
    engine: Arc<dyn WorkflowEngine>,
    cache: RwLock<HashMap<WorkflowName, Arc<HashSet<StateId>>>>,
}

impl EndingStateResolver {
    pub fn new(engine: Arc<dyn WorkflowEngine>) -> Self {
        Self {
            engine,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Ending states of a workflow. A workflow with no states (or an unknown
    /// name) has an empty ending-state set.
    pub fn ending_states(&self, workflow: &WorkflowName) -> Result<Arc<HashSet<StateId>>> {
        if let Some(cached) = self.cache.read().expect("cache lock poisoned").get(workflow) {
            return Ok(cached.clone());
        }

        let computed = Arc::new(self.compute(workflow)?);
        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(workflow.clone(), computed.clone());
        Ok(computed)
    }

    /// Invalidation hook: a state was created in `workflow`. A fresh state
    /// has no outgoing transitions, so it joins the ending set.
    pub fn state_created(&self, workflow: &WorkflowName) {
        self.refresh(workflow);
    }

    /// Invalidation hook: a transition was attached to a state of
    /// `workflow`. The source state is no longer terminal.
    pub fn transition_attached(&self, workflow: &WorkflowName) {
        self.refresh(workflow);
    }

    /// Invalidation hook: a transition was detached from a state of
    /// `workflow`. The source state may have become terminal.
    pub fn transition_detached(&self, workflow: &WorkflowName) {
        self.refresh(workflow);
    }

    /// Evict and recompute, but only for workflows that have been queried
    /// before. Uncached workflows get a fresh computation on first request
    /// anyway.
    fn refresh(&self, workflow: &WorkflowName) {
        let cached = self
            .cache
            .read()
            .expect("cache lock poisoned")
            .contains_key(workflow);
        if !cached {
            return;
        }

        match self.compute(workflow) {
            Ok(states) => {
                tracing::debug!(workflow = %workflow, ending = states.len(), "refreshed ending states");
                self.cache
                    .write()
                    .expect("cache lock poisoned")
                    .insert(workflow.clone(), Arc::new(states));
            }
            Err(err) => {
                // Drop the stale entry; the next query recomputes and
                // surfaces the error to its caller.
                tracing::warn!(workflow = %workflow, error = %err, "evicting ending states after failed refresh");
                self.cache
                    .write()
                    .expect("cache lock poisoned")
                    .remove(workflow);
            }
        }
    }

    fn compute(&self, workflow: &WorkflowName) -> Result<HashSet<StateId>> {
        let mut ending = HashSet::new();
        for state in self.engine.workflow_states(workflow)? {
            if self.engine.outgoing_transitions(&state.id)?.is_empty() {
                ending.insert(state.id);
            }
        }
        Ok(ending)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn empty_workflow_has_no_ending_states() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_workflow("standard");
        let resolver = EndingStateResolver::new(backend);

        let ending = resolver.ending_states(&"standard".into()).unwrap();
        assert!(ending.is_empty());
    }

    #[test]
    fn unknown_workflow_has_no_ending_states() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = EndingStateResolver::new(backend);
        assert!(resolver.ending_states(&"missing".into()).unwrap().is_empty());
    }

    #[test]
    fn states_without_transitions_are_ending() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_workflow("standard");
        backend.add_state("standard", "private", "Private");
        backend.add_state("standard", "public", "Public");
        let resolver = EndingStateResolver::new(backend.clone());

        // both states have no outgoing transitions yet
        let ending = resolver.ending_states(&"standard".into()).unwrap();
        assert_eq!(ending.len(), 2);

        // branch a transition off "private"
        let publish = backend.add_transition("standard", "publish", "Make public", "public", None);
        backend.attach_transition(&"private".into(), &publish.id);
        resolver.transition_attached(&"standard".into());

        let ending = resolver.ending_states(&"standard".into()).unwrap();
        assert_eq!(ending.len(), 1);
        assert!(ending.contains(&StateId::new("public")));

        // close the cycle: no ending states left
        let unpublish =
            backend.add_transition("standard", "unpublish", "Make private", "private", None);
        backend.attach_transition(&"public".into(), &unpublish.id);
        resolver.transition_attached(&"standard".into());

        assert!(resolver.ending_states(&"standard".into()).unwrap().is_empty());
    }

    #[test]
    fn new_terminal_state_joins_cached_set() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_workflow("standard");
        backend.add_state("standard", "private", "Private");
        let resolver = EndingStateResolver::new(backend.clone());

        // prime the cache
        assert_eq!(resolver.ending_states(&"standard".into()).unwrap().len(), 1);

        backend.add_state("standard", "rejected", "Rejected");
        resolver.state_created(&"standard".into());

        let ending = resolver.ending_states(&"standard".into()).unwrap();
        assert_eq!(ending.len(), 2);
        assert!(ending.contains(&StateId::new("rejected")));
    }

    #[test]
    fn detaching_a_transition_makes_the_source_terminal_again() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_workflow("standard");
        backend.add_state("standard", "private", "Private");
        backend.add_state("standard", "public", "Public");
        let publish = backend.add_transition("standard", "publish", "Make public", "public", None);
        backend.attach_transition(&"private".into(), &publish.id);
        let resolver = EndingStateResolver::new(backend.clone());

        let ending = resolver.ending_states(&"standard".into()).unwrap();
        assert!(!ending.contains(&StateId::new("private")));

        backend.detach_transition(&"private".into(), &publish.id);
        resolver.transition_detached(&"standard".into());

        let ending = resolver.ending_states(&"standard".into()).unwrap();
        assert!(ending.contains(&StateId::new("private")));
    }

    #[test]
    fn refresh_ignores_workflows_never_queried() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_workflow("standard");
        let resolver = EndingStateResolver::new(backend.clone());

        // nothing cached yet, hooks are a no-op
        resolver.state_created(&"standard".into());
        assert!(resolver.cache.read().unwrap().is_empty());
    }
}
