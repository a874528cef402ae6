//! The [`Decoration`] trait, decoration identity, and the provider
//! lifecycle.
//!
//! A decoration is a unit of cross-cutting behavior — logging, error
//! mapping, retry — wrapped around the individual calls of an RPC stub.
//! Decorations never reach the chain directly: they arrive through a
//! [`DecorationProvider`], an identity-bearing factory whose
//! [`InitStrategy`] controls when instances are created and how they are
//! shared.
//!
//! # Implementing a decoration
//!
//! ```rust,ignore
//! use rpc_decor::{BoxFuture, Decoration, Next, ReplyStream, StreamNext, UnaryReply};
//!
//! struct Announcer;
//!
//! impl Decoration for Announcer {
//!     fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
//!         Box::pin(async move {
//!             println!("before");
//!             let reply = next.run().await;
//!             println!("after");
//!             reply
//!         })
//!     }
//!
//!     fn around_stream(&self, next: StreamNext) -> ReplyStream {
//!         next.run()
//!     }
//! }
//! ```
//!
//! The contract: invoke `next` exactly once and propagate its result,
//! unless deliberately short-circuiting (e.g. serving a cached reply).
//! Short-circuiting is a documented extension point, not something the
//! type system enforces.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::chain::{BoxFuture, Next, ReplyStream, StreamNext, UnaryReply};

/// Identity of a decoration *kind*.
///
/// Ids belong to [`DecorationProvider`]s, not to decoration instances —
/// two providers built around the same decoration type share an id, and
/// strategy actions (`remove`, `replace`) match on it with exact
/// equality. No wildcard or prefix matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecorationId(String);

impl DecorationId {
    /// Creates an id from any string-like token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecorationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A composable before/after wrapper around a single call.
///
/// Both methods receive a handle to the remainder of the chain. For
/// unary calls the handle is [`Next`], which is `Copy` so that retry
/// decorations can re-run the tail of the chain. For streaming calls it
/// is [`StreamNext`], consumed once to build the wrapped stream.
///
/// Responses cross the chain type-erased; decorations that only add
/// before/after behavior or translate errors never need to look inside
/// a reply. See [`chain`](crate::chain) for the typed entry points.
pub trait Decoration: Send + Sync {
    /// Wraps a single-response call.
    ///
    /// Must await `next.run()` exactly once and return its result to the
    /// caller, unless deliberately short-circuiting.
    fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply>;

    /// Wraps a streaming call.
    ///
    /// Must call `next.run()` and return the (possibly wrapped) stream.
    /// Wrapping has to stay lazy: no element may be pulled from the
    /// inner stream until the consumer polls. Decorations that need
    /// start/completion hooks attach them to the stream's lifecycle
    /// (see [`on_stream_completion`](crate::decorations::on_stream_completion))
    /// rather than draining it eagerly.
    ///
    /// The returned stream is `'static`; state a decoration wants to
    /// carry into it must be cloned out of `&self`.
    fn around_stream(&self, next: StreamNext) -> ReplyStream;
}

/// Controls when a [`DecorationProvider`] instantiates its decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// One instance, built eagerly inside the provider's constructor.
    ///
    /// The factory runs exactly once, at construction; a panicking
    /// factory therefore fails provider construction, not retrieval.
    Singleton,

    /// One instance, built on the first retrieval (the first decorated
    /// call that reaches this provider), then shared like [`Singleton`].
    ///
    /// [`Singleton`]: InitStrategy::Singleton
    Lazy,

    /// A fresh instance for every retrieval — once per chain invocation
    /// for unary calls, once per composed stream for streaming calls.
    Factory,
}

/// A cheaply cloneable, shareable reference to a [`DecorationProvider`].
///
/// Strategies, resolved lists, and decorators all hold handles, so a
/// provider's instance cache is shared wherever the provider appears.
pub type ProviderHandle = Arc<DecorationProvider>;

type DecorationFactory = Box<dyn Fn() -> Arc<dyn Decoration> + Send + Sync>;

/// Identity-bearing factory for [`Decoration`] instances.
///
/// The provider owns the instantiation policy so that the same
/// configuration declaration works for cheap stateless decorations
/// ([`InitStrategy::Factory`]) and expensive shared ones
/// ([`InitStrategy::Singleton`]). Because strategy matching removes and
/// replaces providers by [`DecorationId`], the id must be unique per
/// decoration kind within any one list.
///
/// First initialization under [`InitStrategy::Lazy`] is guarded by a
/// [`OnceLock`], so concurrent calls racing on the first retrieval see
/// the factory run at most once.
pub struct DecorationProvider {
    id: DecorationId,
    init: InitStrategy,
    factory: DecorationFactory,
    cached: OnceLock<Arc<dyn Decoration>>,
}

impl DecorationProvider {
    /// Creates a provider with an explicit [`InitStrategy`].
    ///
    /// The factory must produce a fresh instance on every invocation;
    /// the provider, not the factory, is responsible for caching.
    pub fn new(
        id: DecorationId,
        init: InitStrategy,
        factory: impl Fn() -> Arc<dyn Decoration> + Send + Sync + 'static,
    ) -> ProviderHandle {
        let provider = Self {
            id,
            init,
            factory: Box::new(factory),
            cached: OnceLock::new(),
        };
        if provider.init == InitStrategy::Singleton {
            let instance = (provider.factory)();
            let _ = provider.cached.set(instance);
        }
        Arc::new(provider)
    }

    /// Shorthand for [`InitStrategy::Singleton`].
    pub fn singleton(
        id: DecorationId,
        factory: impl Fn() -> Arc<dyn Decoration> + Send + Sync + 'static,
    ) -> ProviderHandle {
        Self::new(id, InitStrategy::Singleton, factory)
    }

    /// Shorthand for [`InitStrategy::Lazy`].
    pub fn lazy(
        id: DecorationId,
        factory: impl Fn() -> Arc<dyn Decoration> + Send + Sync + 'static,
    ) -> ProviderHandle {
        Self::new(id, InitStrategy::Lazy, factory)
    }

    /// Shorthand for [`InitStrategy::Factory`].
    pub fn per_call(
        id: DecorationId,
        factory: impl Fn() -> Arc<dyn Decoration> + Send + Sync + 'static,
    ) -> ProviderHandle {
        Self::new(id, InitStrategy::Factory, factory)
    }

    /// The id strategy actions match against.
    pub fn id(&self) -> &DecorationId {
        &self.id
    }

    /// The instantiation policy this provider was declared with.
    pub fn init_strategy(&self) -> InitStrategy {
        self.init
    }

    /// Retrieves a decoration instance according to the init strategy.
    ///
    /// [`Singleton`](InitStrategy::Singleton) never re-runs the factory
    /// after construction; [`Factory`](InitStrategy::Factory) runs it on
    /// every retrieval.
    pub fn decoration(&self) -> Arc<dyn Decoration> {
        match self.init {
            InitStrategy::Singleton | InitStrategy::Lazy => {
                Arc::clone(self.cached.get_or_init(|| (self.factory)()))
            }
            InitStrategy::Factory => (self.factory)(),
        }
    }
}

impl fmt::Debug for DecorationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecorationProvider")
            .field("id", &self.id)
            .field("init", &self.init)
            .finish_non_exhaustive()
    }
}
