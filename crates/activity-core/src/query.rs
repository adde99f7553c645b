//! Composable queries over managed instances.
//!
//! A `ManagedQuery` is built from a slice of instances and a chain of
//! filters, evaluated lazily when `all()` or `count()` runs. Filters only
//! ever narrow the set; source order is preserved throughout, so chained
//! filters are stable.

use crate::error::Result;
use crate::managed::{ActivityContext, Managed};
use crate::types::RoleId;

type Predicate<'a, M> = Box<dyn Fn(&ActivityContext, &M) -> Result<bool> + 'a>;

pub struct ManagedQuery<'a, M: Managed> {
    ctx: &'a ActivityContext,
    items: Vec<&'a M>,
    filters: Vec<Predicate<'a, M>>,
}

impl<'a, M: Managed> ManagedQuery<'a, M> {
    pub(crate) fn new(ctx: &'a ActivityContext, items: &'a [M]) -> Self {
        Self {
            ctx,
            items: items.iter().collect(),
            filters: Vec::new(),
        }
    }

    /// Keep instances whose current state has the given name.
    pub fn by_state(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.filters.push(Box::new(move |ctx, m| {
            Ok(ctx
                .current_state(m)?
                .is_some_and(|state| state.name == name))
        }));
        self
    }

    /// Keep instances still in flight: a current state with at least one
    /// outgoing transition.
    pub fn pending(mut self) -> Self {
        self.filters.push(Box::new(|ctx, m| {
            match ctx.current_state(m)? {
                Some(state) => {
                    let ending = ctx.resolver().ending_states(&state.workflow)?;
                    Ok(!ending.contains(&state.id))
                }
                None => Ok(false),
            }
        }));
        self
    }

    /// Keep instances that reached an ending state.
    pub fn ended(mut self) -> Self {
        self.filters.push(Box::new(|ctx, m| {
            match ctx.current_state(m)? {
                Some(state) => {
                    let ending = ctx.resolver().ending_states(&state.workflow)?;
                    Ok(ending.contains(&state.id))
                }
                None => Ok(false),
            }
        }));
        self
    }

    /// Keep instances whose current state grants `permission` to at least
    /// one of `roles`.
    pub fn editable_by_roles(mut self, roles: &[RoleId], permission: &str) -> Self {
        let roles = roles.to_vec();
        let permission = permission.to_string();
        self.filters.push(Box::new(move |ctx, m| {
            Ok(ctx.current_state(m)?.is_some_and(|state| {
                ctx.gate().state_grants_any(&state.id, &roles, &permission)
            }))
        }));
        self
    }

    /// Evaluate the query. Results keep the source order.
    pub fn all(&self) -> Result<Vec<&'a M>> {
        let mut matched = Vec::new();
        'items: for &item in &self.items {
            for filter in &self.filters {
                if !filter(self.ctx, item)? {
                    continue 'items;
                }
            }
            matched.push(item);
        }
        Ok(matched)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
