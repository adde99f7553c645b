//! Audit and history layer for workflow-managed business objects.
//!
//! Every state transition performed on a managed object is recorded as an
//! immutable [`Action`]; derived queries classify objects by current state,
//! by pending/ended terminality, and by what a role may edit. The workflow
//! graph, the permission decisions, and the persistent store are external
//! collaborators reached through the [`WorkflowEngine`], [`Authorizer`], and
//! [`ActionStore`] traits; in-memory implementations live in [`memory`].

pub mod action;
pub mod ending;
pub mod engine;
pub mod error;
pub mod executor;
pub mod managed;
pub mod memory;
pub mod permission;
pub mod query;
pub mod subject;
pub mod types;

pub use action::{Action, ActionLog, ActionStore};
pub use ending::EndingStateResolver;
pub use engine::WorkflowEngine;
pub use error::{ActivityError, Result};
pub use executor::{StateChangeSubscriber, StateChanged, TransitionExecutor};
pub use managed::{ActivityContext, Managed};
pub use permission::{Authorizer, PermissionGate, EDIT, VIEW};
pub use query::ManagedQuery;
pub use subject::{SubjectId, SubjectKind, SubjectRef, SubjectRegistry};
pub use types::{RoleId, State, StateId, Transition, TransitionId, UserId, WorkflowName};
