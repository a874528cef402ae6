//! Strategy resolution — applying a [`Strategy`] to a higher-level
//! decoration list.
//!
//! [`resolve`] is a pure function from `(higher-level list, strategy)`
//! to the resolved list for the current level. It runs once per level
//! at decorator construction time; nothing here executes on the call
//! path.
//!
//! # Missing targets
//!
//! `Custom` strategies can name provider ids that are absent from the
//! list they edit. By default that is fatal: resolution aborts with a
//! [`ResolveError`] and the error propagates out of decorator
//! construction. A [`ResolveErrorHook`] registered on the global
//! configuration is offered each error first and may accept it, in
//! which case the failing action is skipped and resolution continues
//! with the remaining actions.

use crate::decoration::ProviderHandle;
use crate::error::ResolveError;
use crate::strategy::{Action, Strategy};
use std::sync::Arc;

/// Global hook consulted when a strategy action cannot find its target.
///
/// Returning `Ok(())` accepts the error: the failing action is skipped
/// and resolution continues. Returning the error (or a different one)
/// aborts resolution, which is also the behavior when no hook is
/// registered.
///
/// Accepting is deliberately permissive — the resolved list will be
/// missing whatever the skipped action would have contributed. A hook
/// that only wants visibility should log and still return `Err`.
pub trait ResolveErrorHook: Send + Sync {
    /// Decide what to do with a resolution error.
    fn on_resolve_error(&self, error: ResolveError) -> Result<(), ResolveError>;
}

impl<F> ResolveErrorHook for F
where
    F: Fn(ResolveError) -> Result<(), ResolveError> + Send + Sync,
{
    fn on_resolve_error(&self, error: ResolveError) -> Result<(), ResolveError> {
        self(error)
    }
}

/// Applies `strategy` to `higher`, producing the resolved list for the
/// current level.
///
/// - [`Strategy::ReplaceAll`] returns the strategy's list verbatim; the
///   higher-level list is discarded entirely.
/// - [`Strategy::AppendAll`] returns the concatenation, both sides in
///   their original order.
/// - [`Strategy::Custom`] applies its actions in declaration order to a
///   copy of `higher`; see the module docs for missing-target handling.
pub fn resolve(
    higher: &[ProviderHandle],
    strategy: &Strategy,
    hook: Option<&dyn ResolveErrorHook>,
) -> Result<Vec<ProviderHandle>, ResolveError> {
    match strategy {
        Strategy::ReplaceAll(providers) => Ok(providers.clone()),
        Strategy::AppendAll(providers) => {
            let mut resolved = higher.to_vec();
            resolved.extend(providers.iter().cloned());
            Ok(resolved)
        }
        Strategy::Custom(actions) => resolve_custom(higher, actions, hook),
    }
}

fn resolve_custom(
    higher: &[ProviderHandle],
    actions: &[Action],
    hook: Option<&dyn ResolveErrorHook>,
) -> Result<Vec<ProviderHandle>, ResolveError> {
    let mut resolved = higher.to_vec();
    for action in actions {
        if let Err(error) = apply_action(&mut resolved, action) {
            match hook {
                Some(hook) => hook.on_resolve_error(error)?,
                None => return Err(error),
            }
        }
    }
    Ok(resolved)
}

fn apply_action(resolved: &mut Vec<ProviderHandle>, action: &Action) -> Result<(), ResolveError> {
    match action {
        Action::Remove(id) => match resolved.iter().position(|p| p.id() == id) {
            Some(index) => {
                resolved.remove(index);
                Ok(())
            }
            None => Err(ResolveError::RemoveTargetNotFound { id: id.clone() }),
        },
        Action::Replace { target, with } => {
            match resolved.iter_mut().find(|p| p.id() == target) {
                Some(slot) => {
                    *slot = Arc::clone(with);
                    Ok(())
                }
                None => Err(ResolveError::ReplaceTargetNotFound { id: target.clone() }),
            }
        }
        Action::Append(provider) => {
            resolved.push(Arc::clone(provider));
            Ok(())
        }
    }
}
