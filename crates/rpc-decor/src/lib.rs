//! Declarative decoration of RPC stubs.
//!
//! `rpc-decor` wraps the calls of an existing async RPC stub with
//! composable cross-cutting behavior (logging, error mapping, retry)
//! without touching the stub itself. Decorations are declared at three
//! levels — global, per stub, per call — and merged by declarative
//! strategies into one ordered chain per call.
//!
//! # Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`decoration`] | The [`Decoration`] trait, ids, and the provider lifecycle |
//! | [`strategy`] | Declarative merge rules between decoration lists |
//! | [`resolve`] | Applying a strategy to a higher-level list |
//! | [`chain`] | Executing a call through an ordered decoration list |
//! | [`config`] | The shared global configuration |
//! | [`decorator`] | Per-stub assembly and dispatch |
//! | [`decorations`] | Built-ins: logging, error mapping, retry, no-op |
//! | [`error`] | [`CallError`] and [`ResolveError`] |
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use rpc_decor::{CallError, GlobalConfig, Strategy, StubDecorator};
//! use rpc_decor::decorations::ExceptionMapping;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let global = Arc::new(
//!     GlobalConfig::new().with_provider(ExceptionMapping::provider(|err| err)),
//! );
//!
//! let decorator = StubDecorator::builder()
//!     .global(global)
//!     .stub_strategy(Strategy::no_changes())
//!     .build()?;
//!
//! let article: String = decorator
//!     .unary("get_article", || async { Ok("article body".to_owned()) })
//!     .await?;
//! # let _ = article;
//! # Ok(())
//! # }
//! ```
//!
//! # Ordering
//!
//! A resolved decoration list executes outermost-first: the decoration
//! at index 0 sees the call first on the way in and last on the way
//! out. The order is fixed at decorator construction and identical for
//! every invocation.
//!
//! # Feature flags
//!
//! - `tracing` (default): the [`decorations::Logging`] decoration and
//!   its `tracing` dependency.

#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod decoration;
pub mod decorations;
pub mod decorator;
pub mod error;
pub mod resolve;
pub mod strategy;

pub use chain::{
    execute_stream, execute_unary, BoxFuture, Next, Reply, ReplyStream, ResponseStream,
    StreamNext, UnaryReply,
};
pub use config::GlobalConfig;
pub use decoration::{
    Decoration, DecorationId, DecorationProvider, InitStrategy, ProviderHandle,
};
pub use decorator::{StubDecorator, StubDecoratorBuilder};
pub use error::{CallError, ResolveError};
pub use resolve::{resolve, ResolveErrorHook};
pub use strategy::{Action, CustomStrategyBuilder, Strategy};
