//! Global configuration shared by all stub decorators.
//!
//! A [`GlobalConfig`] declares the base decoration list that every
//! stub-level strategy resolves against, plus the optional
//! [`ResolveErrorHook`] consulted when a strategy action cannot find its
//! target. It is assembled once at startup and shared by handle:
//!
//! ```rust
//! use std::sync::Arc;
//! use rpc_decor::GlobalConfig;
//! use rpc_decor::decorations::ExceptionMapping;
//!
//! let global = Arc::new(
//!     GlobalConfig::new().with_provider(ExceptionMapping::provider(|err| err)),
//! );
//! # let _ = global;
//! ```
//!
//! Sharing matters for init strategies: a provider declared here with
//! [`InitStrategy::Singleton`](crate::InitStrategy::Singleton) is a true
//! process-wide singleton exactly because every decorator resolves
//! against the same provider handles. Building a fresh `GlobalConfig`
//! per decorator would instead give each decorator its own instance.

use std::sync::Arc;

use crate::decoration::ProviderHandle;
use crate::resolve::ResolveErrorHook;

/// The optional top level of the configuration hierarchy.
#[derive(Default)]
pub struct GlobalConfig {
    providers: Vec<ProviderHandle>,
    hook: Option<Arc<dyn ResolveErrorHook>>,
}

impl GlobalConfig {
    /// An empty configuration: no base decorations, strict resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one provider to the base list.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderHandle) -> Self {
        self.providers.push(provider);
        self
    }

    /// Appends several providers, preserving order.
    #[must_use]
    pub fn with_providers(mut self, providers: impl IntoIterator<Item = ProviderHandle>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Registers the hook offered every resolution error.
    ///
    /// Without a hook, resolution errors abort decorator construction
    /// (the strict default).
    #[must_use]
    pub fn with_resolve_error_hook(mut self, hook: impl ResolveErrorHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// The base decoration list, in declaration order.
    pub fn providers(&self) -> &[ProviderHandle] {
        &self.providers
    }

    /// The registered hook, if any.
    pub fn resolve_error_hook(&self) -> Option<&dyn ResolveErrorHook> {
        self.hook.as_deref()
    }
}

impl std::fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("providers", &self.providers)
            .field("hook", &self.hook.as_ref().map(|_| "registered"))
            .finish()
    }
}
