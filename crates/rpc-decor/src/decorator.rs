//! [`StubDecorator`] — the construction-time assembly of the three-level
//! configuration hierarchy, and the per-call dispatch helpers adapters
//! build on.
//!
//! A stub adapter owns one `StubDecorator` next to the real stub and
//! routes each wrapper method through it:
//!
//! ```rust,ignore
//! struct ArticleClient {
//!     stub: ArticleStub,
//!     decorator: StubDecorator,
//! }
//!
//! impl ArticleClient {
//!     async fn get_article(&self, id: u64) -> Result<Article, CallError> {
//!         self.decorator
//!             .unary("get_article", || self.stub.get_article(id))
//!             .await
//!     }
//! }
//! ```
//!
//! # Resolution happens once
//!
//! `build()` resolves the stub-level list against the global list, then
//! resolves and caches one list per call that declares its own strategy.
//! Calls without a declared strategy dispatch on the stub-level list
//! itself, not a copy. After construction everything is immutable, so a
//! decorator can serve any number of concurrent invocations.
//!
//! Resolution errors (a `Custom` strategy naming an absent id) therefore
//! surface from `build()`, never from a call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::Stream;

use crate::chain::{execute_stream, execute_unary, ResponseStream};
use crate::config::GlobalConfig;
use crate::decoration::ProviderHandle;
use crate::error::{CallError, ResolveError};
use crate::resolve::resolve;
use crate::strategy::Strategy;

/// Resolved decoration lists for one decorated stub.
#[derive(Debug)]
pub struct StubDecorator {
    stub_providers: Vec<ProviderHandle>,
    call_providers: HashMap<String, Vec<ProviderHandle>>,
}

impl StubDecorator {
    /// Starts assembling a decorator.
    ///
    /// The stub strategy defaults to [`Strategy::no_changes`]: the
    /// global list is used as-is.
    pub fn builder() -> StubDecoratorBuilder {
        StubDecoratorBuilder {
            global: None,
            stub_strategy: Strategy::no_changes(),
            call_strategies: Vec::new(),
        }
    }

    /// The resolved provider list for a named call.
    ///
    /// Calls that declared their own strategy get their cached list;
    /// everything else gets the stub-level list.
    pub fn providers_for(&self, call_name: &str) -> &[ProviderHandle] {
        self.call_providers
            .get(call_name)
            .map_or(&self.stub_providers, Vec::as_slice)
    }

    /// The stub-level resolved list.
    pub fn stub_providers(&self) -> &[ProviderHandle] {
        &self.stub_providers
    }

    /// Runs a unary call through the chain resolved for `call_name`.
    pub async fn unary<'c, Resp, F, Fut>(
        &self,
        call_name: &str,
        call: F,
    ) -> Result<Resp, CallError>
    where
        Resp: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'c,
        Fut: Future<Output = Result<Resp, CallError>> + Send + 'c,
    {
        execute_unary(self.providers_for(call_name), call).await
    }

    /// Composes a streaming call through the chain resolved for
    /// `call_name`.
    pub fn stream<Resp, F, S>(&self, call_name: &str, call: F) -> ResponseStream<Resp>
    where
        Resp: Send + 'static,
        F: FnOnce() -> S + Send + 'static,
        S: Stream<Item = Result<Resp, CallError>> + Send + 'static,
    {
        execute_stream(self.providers_for(call_name), call)
    }
}

/// Builder for [`StubDecorator`].
#[must_use = "call `.build()` to resolve the decoration lists"]
pub struct StubDecoratorBuilder {
    global: Option<Arc<GlobalConfig>>,
    stub_strategy: Strategy,
    call_strategies: Vec<(String, Strategy)>,
}

impl StubDecoratorBuilder {
    /// Attaches the shared global configuration.
    pub fn global(mut self, config: impl Into<Arc<GlobalConfig>>) -> Self {
        self.global = Some(config.into());
        self
    }

    /// Sets the stub-level strategy, resolved against the global list.
    pub fn stub_strategy(mut self, strategy: Strategy) -> Self {
        self.stub_strategy = strategy;
        self
    }

    /// Declares a call-level strategy, resolved against the stub-level
    /// result.
    pub fn call_strategy(mut self, call_name: impl Into<String>, strategy: Strategy) -> Self {
        self.call_strategies.push((call_name.into(), strategy));
        self
    }

    /// Resolves all levels and builds the decorator.
    ///
    /// Fails if any strategy action cannot find its target and the
    /// global hook (if any) does not accept the error.
    pub fn build(self) -> Result<StubDecorator, ResolveError> {
        let (global_providers, hook) = match self.global.as_deref() {
            Some(config) => (config.providers(), config.resolve_error_hook()),
            None => (&[] as &[ProviderHandle], None),
        };

        let stub_providers = resolve(global_providers, &self.stub_strategy, hook)?;

        let mut call_providers = HashMap::with_capacity(self.call_strategies.len());
        for (call_name, strategy) in self.call_strategies {
            let resolved = resolve(&stub_providers, &strategy, hook)?;
            call_providers.insert(call_name, resolved);
        }

        Ok(StubDecorator {
            stub_providers,
            call_providers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{DecorationId, DecorationProvider};
    use crate::decorations::NoOp;

    fn provider(id: &str) -> ProviderHandle {
        DecorationProvider::per_call(DecorationId::new(id), || Arc::new(NoOp))
    }

    fn ids(providers: &[ProviderHandle]) -> Vec<&str> {
        providers.iter().map(|p| p.id().as_str()).collect()
    }

    #[test]
    fn default_build_is_empty() {
        let decorator = StubDecorator::builder().build().unwrap();
        assert!(decorator.stub_providers().is_empty());
        assert!(decorator.providers_for("anything").is_empty());
    }

    #[test]
    fn stub_strategy_defaults_to_no_changes() {
        let global = GlobalConfig::new().with_providers([provider("g1"), provider("g2")]);
        let decorator = StubDecorator::builder().global(global).build().unwrap();

        assert_eq!(ids(decorator.stub_providers()), ["g1", "g2"]);
    }

    #[test]
    fn calls_without_a_strategy_share_the_stub_list() {
        let global = GlobalConfig::new().with_provider(provider("g1"));
        let decorator = StubDecorator::builder().global(global).build().unwrap();

        // Same slice, not a copy.
        assert!(std::ptr::eq(
            decorator.providers_for("undeclared").as_ptr(),
            decorator.stub_providers().as_ptr(),
        ));
    }

    #[test]
    fn call_strategy_resolves_against_the_stub_list() {
        let global = GlobalConfig::new().with_providers([provider("g1"), provider("g2")]);
        let decorator = StubDecorator::builder()
            .global(global)
            .stub_strategy(Strategy::append_all([provider("s1")]))
            .call_strategy(
                "special",
                Strategy::custom().remove(DecorationId::new("g1")).build(),
            )
            .build()
            .unwrap();

        assert_eq!(ids(decorator.stub_providers()), ["g1", "g2", "s1"]);
        assert_eq!(ids(decorator.providers_for("special")), ["g2", "s1"]);
        assert_eq!(ids(decorator.providers_for("other")), ["g1", "g2", "s1"]);
    }

    #[test]
    fn resolution_errors_surface_from_build() {
        let err = StubDecorator::builder()
            .stub_strategy(Strategy::custom().remove(DecorationId::new("ghost")).build())
            .build()
            .unwrap_err();

        assert!(matches!(err, ResolveError::RemoveTargetNotFound { .. }));
    }

    #[test]
    fn call_level_resolution_errors_surface_from_build() {
        let global = GlobalConfig::new().with_provider(provider("g1"));
        let err = StubDecorator::builder()
            .global(global)
            .call_strategy(
                "broken",
                Strategy::custom()
                    .replace(DecorationId::new("ghost"), provider("x"))
                    .build(),
            )
            .build()
            .unwrap_err();

        assert!(matches!(err, ResolveError::ReplaceTargetNotFound { .. }));
    }

    #[test]
    fn accepting_hook_lets_build_continue() {
        let global = GlobalConfig::new()
            .with_provider(provider("g1"))
            .with_resolve_error_hook(|_: ResolveError| -> Result<(), ResolveError> { Ok(()) });

        let decorator = StubDecorator::builder()
            .global(global)
            .stub_strategy(
                Strategy::custom()
                    .remove(DecorationId::new("ghost"))
                    .append(provider("s1"))
                    .build(),
            )
            .build()
            .unwrap();

        assert_eq!(ids(decorator.stub_providers()), ["g1", "s1"]);
    }

    #[tokio::test]
    async fn unary_dispatches_through_the_resolved_chain() {
        let decorator = StubDecorator::builder().build().unwrap();
        let result: Result<String, CallError> = decorator
            .unary("get", || async { Ok("reply".to_owned()) })
            .await;
        assert_eq!(result.unwrap(), "reply");
    }

    #[tokio::test]
    async fn stream_dispatches_through_the_resolved_chain() {
        use futures::StreamExt;

        let decorator = StubDecorator::builder().build().unwrap();
        let stream = decorator.stream("list", || futures::stream::iter([Ok(1_u32), Ok(2)]));
        let values: Vec<u32> = stream.map(Result::unwrap).collect().await;
        assert_eq!(values, [1, 2]);
    }
}
