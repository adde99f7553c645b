//! State-change orchestration: move the state pointer, then notify
//! subscribers.

use crate::engine::WorkflowEngine;
use crate::error::{ActivityError, Result};
use crate::subject::SubjectRef;
use crate::types::{State, Transition, UserId};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// StateChanged
// ---------------------------------------------------------------------------

/// Published after a subject's state pointer moved. Carries owned snapshots
/// so subscribers never reach back into the engine mid-delivery.
#[derive(Debug, Clone)]
pub struct StateChanged {
    pub subject: SubjectRef,
    pub transition: Transition,
    pub actor: Option<UserId>,
    pub previous_state: State,
}

pub trait StateChangeSubscriber: Send + Sync {
    fn on_state_changed(&self, event: &StateChanged) -> Result<()>;
}

// ---------------------------------------------------------------------------
// TransitionExecutor
// ---------------------------------------------------------------------------

/// Executes a single state change: read previous state, apply the
/// transition's destination, publish [`StateChanged`] to subscribers in
/// registration order.
///
/// Delivery is fail-fast: the first subscriber error aborts delivery to
/// later subscribers and propagates to the caller. The state pointer has
/// already moved at that point and is not rolled back, so a caller seeing an
/// error from [`change_state`](Self::change_state) must treat the subject's
/// state as indeterminate.
pub struct TransitionExecutor {
    engine: Arc<dyn WorkflowEngine>,
    subscribers: Vec<Box<dyn StateChangeSubscriber>>,
}

impl TransitionExecutor {
    pub fn new(engine: Arc<dyn WorkflowEngine>) -> Self {
        Self {
            engine,
            subscribers: Vec::new(),
        }
    }

    /// Register a subscriber. Subscribers are notified in registration
    /// order.
    pub fn subscribe(&mut self, subscriber: Box<dyn StateChangeSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn change_state(
        &self,
        subject: &SubjectRef,
        transition: &Transition,
        actor: Option<&UserId>,
    ) -> Result<()> {
        let previous_state = self
            .engine
            .current_state(subject)?
            .ok_or_else(|| ActivityError::NoCurrentState(subject.clone()))?;

        self.engine.set_state(subject, &transition.destination)?;
        tracing::debug!(
            subject = %subject,
            transition = %transition.id,
            from = %previous_state.id,
            to = %transition.destination,
            "state changed"
        );

        let event = StateChanged {
            subject: subject.clone(),
            transition: transition.clone(),
            actor: actor.cloned(),
            previous_state,
        };
        for subscriber in &self.subscribers {
            subscriber.on_state_changed(&event)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::types::StateId;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<StateChanged>>);

    impl StateChangeSubscriber for Recorder {
        fn on_state_changed(&self, event: &StateChanged) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    impl StateChangeSubscriber for Failing {
        fn on_state_changed(&self, _event: &StateChanged) -> Result<()> {
            Err(ActivityError::Backend("subscriber down".into()))
        }
    }

    fn backend() -> (Arc<MemoryBackend>, Transition) {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_workflow("standard");
        backend.add_state("standard", "private", "Private");
        backend.add_state("standard", "public", "Public");
        let publish = backend.add_transition("standard", "publish", "Make public", "public", None);
        backend.attach_transition(&StateId::new("private"), &publish.id);
        (backend, publish)
    }

    #[test]
    fn publishes_event_with_previous_state() {
        let (backend, publish) = backend();
        let page = SubjectRef::new("page", "1");
        backend.set_workflow(&page, &"standard".into()).unwrap();

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut executor = TransitionExecutor::new(backend.clone());
        executor.subscribe(Box::new(ArcSubscriber(recorder.clone())));

        executor
            .change_state(&page, &publish, Some(&UserId::new("bob")))
            .unwrap();

        assert_eq!(
            backend.current_state(&page).unwrap().unwrap().id,
            StateId::new("public")
        );
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].previous_state.id, StateId::new("private"));
        assert_eq!(events[0].actor, Some(UserId::new("bob")));
        assert_eq!(events[0].transition.id, publish.id);
    }

    #[test]
    fn unmanaged_subject_is_an_error() {
        let (backend, publish) = backend();
        let executor = TransitionExecutor::new(backend);
        let err = executor
            .change_state(&SubjectRef::new("page", "9"), &publish, None)
            .unwrap_err();
        assert!(matches!(err, ActivityError::NoCurrentState(_)));
    }

    #[test]
    fn failing_subscriber_aborts_delivery_but_state_moved() {
        let (backend, publish) = backend();
        let page = SubjectRef::new("page", "1");
        backend.set_workflow(&page, &"standard".into()).unwrap();

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut executor = TransitionExecutor::new(backend.clone());
        executor.subscribe(Box::new(Failing));
        executor.subscribe(Box::new(ArcSubscriber(recorder.clone())));

        let err = executor.change_state(&page, &publish, None).unwrap_err();
        assert!(matches!(err, ActivityError::Backend(_)));
        // fail-fast: the later subscriber never saw the event
        assert!(recorder.0.lock().unwrap().is_empty());
        // but the state pointer already moved
        assert_eq!(
            backend.current_state(&page).unwrap().unwrap().id,
            StateId::new("public")
        );
    }

    struct ArcSubscriber(Arc<Recorder>);

    impl StateChangeSubscriber for ArcSubscriber {
        fn on_state_changed(&self, event: &StateChanged) -> Result<()> {
            self.0.on_state_changed(event)
        }
    }
}
