//! Tagged references to managed business objects.
//!
//! An `Action` must be able to point at any domain type without knowing it.
//! Instead of a reflective type lookup, the reference is an explicit
//! `{kind, id}` pair, and a `SubjectRegistry` maps each kind to a resolver
//! closure that can materialize the underlying object on demand.

use crate::types::WorkflowName;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// SubjectRef
// ---------------------------------------------------------------------------

/// Domain-type tag of a managed object (e.g. `"page"`, `"invoice"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectKind(pub String);

impl SubjectKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectKind {
    fn from(kind: &str) -> Self {
        Self(kind.to_string())
    }
}

/// Identifier of a managed object within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Tagged reference to a managed object: which kind of thing, and which one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: SubjectId,
}

impl SubjectRef {
    pub fn new(kind: impl Into<SubjectKind>, id: impl Into<SubjectId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// SubjectRegistry
// ---------------------------------------------------------------------------

/// Closure resolving a subject id to the underlying domain object.
pub type SubjectResolver =
    Box<dyn Fn(&SubjectId) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// Registry of managed kinds.
///
/// For each kind the embedder may register a resolver (used to lazily
/// materialize the object an `Action` points at) and a default workflow
/// (used when a subject is initiated without an explicit workflow).
#[derive(Default)]
pub struct SubjectRegistry {
    resolvers: HashMap<SubjectKind, SubjectResolver>,
    default_workflows: HashMap<SubjectKind, WorkflowName>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resolver(&mut self, kind: impl Into<SubjectKind>, resolver: SubjectResolver) {
        self.resolvers.insert(kind.into(), resolver);
    }

    pub fn register_default_workflow(
        &mut self,
        kind: impl Into<SubjectKind>,
        workflow: impl Into<WorkflowName>,
    ) {
        self.default_workflows.insert(kind.into(), workflow.into());
    }

    /// Materialize the object a reference points at, if the kind has a
    /// resolver and the object still exists.
    pub fn resolve(&self, subject: &SubjectRef) -> Option<Arc<dyn Any + Send + Sync>> {
        self.resolvers.get(&subject.kind)?(&subject.id)
    }

    pub fn default_workflow(&self, kind: &SubjectKind) -> Option<&WorkflowName> {
        self.default_workflows.get(kind)
    }
}

impl fmt::Debug for SubjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectRegistry")
            .field("resolvers", &self.resolvers.keys())
            .field("default_workflows", &self.default_workflows)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_ref_display() {
        let s = SubjectRef::new("page", "1");
        assert_eq!(s.to_string(), "page #1");
    }

    #[test]
    fn registry_resolves_known_kind() {
        let mut registry = SubjectRegistry::new();
        registry.register_resolver(
            "page",
            Box::new(|id| {
                (id.as_str() == "1")
                    .then(|| Arc::new("Page 1".to_string()) as Arc<dyn Any + Send + Sync>)
            }),
        );

        let found = registry.resolve(&SubjectRef::new("page", "1")).unwrap();
        assert_eq!(found.downcast_ref::<String>().unwrap(), "Page 1");

        assert!(registry.resolve(&SubjectRef::new("page", "2")).is_none());
        assert!(registry.resolve(&SubjectRef::new("invoice", "1")).is_none());
    }

    #[test]
    fn registry_default_workflow() {
        let mut registry = SubjectRegistry::new();
        registry.register_default_workflow("page", "standard");

        assert_eq!(
            registry.default_workflow(&SubjectKind::new("page")),
            Some(&WorkflowName::new("standard"))
        );
        assert!(registry.default_workflow(&SubjectKind::new("invoice")).is_none());
    }
}
