//! Declarative merge rules between decoration lists.
//!
//! Decoration lists live at three levels — global, stub, call — and a
//! [`Strategy`] describes how the list declared at one level combines
//! with the resolved list of the level above it. Strategies are plain
//! data; applying one is the job of [`resolve`](crate::resolve).
//!
//! # Building strategies
//!
//! ```rust
//! use std::sync::Arc;
//! use rpc_decor::{DecorationId, DecorationProvider, Strategy};
//! use rpc_decor::decorations::NoOp;
//!
//! let noop = |id: &str| {
//!     DecorationProvider::per_call(DecorationId::new(id), || Arc::new(NoOp))
//! };
//!
//! // Keep the higher-level list untouched (the stub-level default).
//! let unchanged = Strategy::no_changes();
//!
//! // Discard the higher-level list entirely.
//! let replaced = Strategy::replace_all([noop("audit")]);
//!
//! // Surgical edits, applied in declaration order.
//! let custom = Strategy::custom()
//!     .remove(DecorationId::new("logging"))
//!     .replace(DecorationId::new("retry"), noop("retry-aggressive"))
//!     .append(noop("metrics"))
//!     .build();
//! # let _ = (unchanged, replaced, custom);
//! ```

use crate::decoration::{DecorationId, ProviderHandle};

/// How a level's decoration list merges with the one above it.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Discard the higher-level list and use this one verbatim.
    ReplaceAll(Vec<ProviderHandle>),

    /// The higher-level list followed by this one, relative order
    /// preserved on both sides, duplicates allowed.
    AppendAll(Vec<ProviderHandle>),

    /// An ordered list of surgical edits applied to a mutable copy of
    /// the higher-level list.
    Custom(Vec<Action>),
}

impl Strategy {
    /// A strategy that keeps the higher-level list untouched.
    ///
    /// This is the default stub-level strategy: append nothing.
    pub fn no_changes() -> Self {
        Self::AppendAll(Vec::new())
    }

    /// Builds a [`Strategy::ReplaceAll`].
    pub fn replace_all(providers: impl IntoIterator<Item = ProviderHandle>) -> Self {
        Self::ReplaceAll(providers.into_iter().collect())
    }

    /// Builds a [`Strategy::AppendAll`].
    pub fn append_all(providers: impl IntoIterator<Item = ProviderHandle>) -> Self {
        Self::AppendAll(providers.into_iter().collect())
    }

    /// Starts building a [`Strategy::Custom`].
    pub fn custom() -> CustomStrategyBuilder {
        CustomStrategyBuilder {
            actions: Vec::new(),
        }
    }
}

/// One edit inside a [`Strategy::Custom`].
///
/// Actions apply in declaration order, each one seeing the list as left
/// by its predecessors.
#[derive(Debug, Clone)]
pub enum Action {
    /// Delete the first provider whose id matches.
    Remove(DecorationId),

    /// Substitute a provider in place, keeping its position.
    Replace {
        /// Id of the provider to be replaced.
        target: DecorationId,
        /// The provider taking its place.
        with: ProviderHandle,
    },

    /// Push a provider onto the end of the list.
    Append(ProviderHandle),
}

/// Ordered builder for [`Strategy::Custom`].
#[derive(Debug)]
#[must_use = "call `.build()` to obtain the strategy"]
pub struct CustomStrategyBuilder {
    actions: Vec<Action>,
}

impl CustomStrategyBuilder {
    /// Queues a [`Action::Remove`].
    pub fn remove(mut self, id: DecorationId) -> Self {
        self.actions.push(Action::Remove(id));
        self
    }

    /// Queues a [`Action::Replace`].
    pub fn replace(mut self, target: DecorationId, with: ProviderHandle) -> Self {
        self.actions.push(Action::Replace { target, with });
        self
    }

    /// Queues a [`Action::Append`].
    pub fn append(mut self, provider: ProviderHandle) -> Self {
        self.actions.push(Action::Append(provider));
        self
    }

    /// Finishes the strategy.
    pub fn build(self) -> Strategy {
        Strategy::Custom(self.actions)
    }
}
