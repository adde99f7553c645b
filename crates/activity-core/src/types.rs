use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Unique name of a workflow. The name is the workflow's identifier:
    /// the definition engine guarantees it is unique, so it doubles as the
    /// ending-state cache key.
    WorkflowName
);

string_id!(
    /// Identifier of a state within the definition engine.
    StateId
);

string_id!(
    /// Identifier of a transition within the definition engine.
    TransitionId
);

string_id!(
    /// Identifier of a user in the external auth system.
    UserId
);

string_id!(
    /// Identifier of a role in the external permission system.
    RoleId
);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Read-only snapshot of a workflow state, as handed out by the definition
/// engine. A state is terminal iff it has no outgoing transitions; that is a
/// derived property, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub name: String,
    pub workflow: WorkflowName,
}

impl State {
    pub fn new(
        id: impl Into<StateId>,
        name: impl Into<String>,
        workflow: impl Into<WorkflowName>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            workflow: workflow.into(),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Read-only snapshot of a transition. `permission` is the code a user must
/// hold on the subject for the definition engine to allow the transition;
/// `None` means unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,
    pub name: String,
    pub workflow: WorkflowName,
    pub destination: StateId,
    pub permission: Option<String>,
}

impl Transition {
    pub fn new(
        id: impl Into<TransitionId>,
        name: impl Into<String>,
        workflow: impl Into<WorkflowName>,
        destination: impl Into<StateId>,
        permission: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            workflow: workflow.into(),
            destination: destination.into(),
            permission: permission.map(str::to_string),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_and_eq() {
        let a = StateId::new("private");
        let b = StateId::from("private");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "private");
    }

    #[test]
    fn transition_permission_optional() {
        let t = Transition::new("publish", "Publish", "standard", "public", None);
        assert!(t.permission.is_none());

        let t = Transition::new("publish", "Publish", "standard", "public", Some("edit"));
        assert_eq!(t.permission.as_deref(), Some("edit"));
    }
}
