//! Built-in decorations for common cross-cutting concerns.
//!
//! Everything here is an ordinary [`Decoration`] — nothing is special-
//! cased by the chain. Each built-in exposes a conventional
//! [`DecorationId`] via an `id()` constructor plus a `provider()`
//! shorthand, so configurations can remove or replace them by id:
//!
//! ```rust
//! use rpc_decor::{CallError, Strategy};
//! use rpc_decor::decorations::ExceptionMapping;
//!
//! let strategy = Strategy::append_all([ExceptionMapping::provider(|err| {
//!     match err {
//!         CallError::Transport { message, .. } => CallError::Status {
//!             code: "unavailable".into(),
//!             message,
//!             retryable: true,
//!         },
//!         other => other,
//!     }
//! })]);
//! # let _ = strategy;
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};

use crate::chain::{BoxFuture, Next, Reply, ReplyStream, StreamNext, UnaryReply};
use crate::decoration::{Decoration, DecorationId, DecorationProvider, InitStrategy, ProviderHandle};
use crate::error::CallError;

/// Pass-through decoration that does nothing.
///
/// Useful in tests and as a placeholder while wiring configuration.
#[derive(Debug, Clone, Default)]
pub struct NoOp;

impl Decoration for NoOp {
    fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
        Box::pin(next.run())
    }

    fn around_stream(&self, next: StreamNext) -> ReplyStream {
        next.run()
    }
}

/// Attaches a hook to a stream that fires once, when the stream
/// completes normally.
///
/// The hook observes *completion*, not consumption: it runs when the
/// inner stream yields its end-of-stream marker. If the consumer drops
/// the stream early, the hook never fires. Hooks attached by inner
/// decorations fire before hooks attached by outer ones, because the
/// outer wrapper only sees the end of the stream after the inner one
/// has already reported it.
pub fn on_stream_completion(
    stream: ReplyStream,
    hook: impl FnOnce() + Send + 'static,
) -> ReplyStream {
    Box::pin(CompletionHook {
        inner: stream,
        hook: Some(Box::new(hook)),
    })
}

struct CompletionHook {
    inner: ReplyStream,
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Stream for CompletionHook {
    type Item = Result<Reply, CallError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                if let Some(hook) = self.hook.take() {
                    hook();
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// Translates call errors with a user-supplied mapper.
///
/// [`CallError::Cancelled`] is exempt: cancellation always reaches the
/// original caller unmapped, regardless of what the mapper would do
/// with it. All other failures from inner decorations or the call
/// itself pass through the mapper exactly once.
pub struct ExceptionMapping {
    mapper: Arc<dyn Fn(CallError) -> CallError + Send + Sync>,
}

impl ExceptionMapping {
    /// Creates a mapping decoration from a mapper function.
    pub fn new(mapper: impl Fn(CallError) -> CallError + Send + Sync + 'static) -> Self {
        Self {
            mapper: Arc::new(mapper),
        }
    }

    /// The conventional provider id for this decoration kind.
    pub fn id() -> DecorationId {
        DecorationId::new("rpc_decor::decorations::ExceptionMapping")
    }

    /// A singleton provider under the conventional id.
    pub fn provider(
        mapper: impl Fn(CallError) -> CallError + Send + Sync + 'static,
    ) -> ProviderHandle {
        let mapper: Arc<dyn Fn(CallError) -> CallError + Send + Sync> = Arc::new(mapper);
        DecorationProvider::new(Self::id(), InitStrategy::Singleton, move || {
            Arc::new(Self {
                mapper: Arc::clone(&mapper),
            })
        })
    }
}

impl std::fmt::Debug for ExceptionMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionMapping").finish_non_exhaustive()
    }
}

impl Decoration for ExceptionMapping {
    fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
        Box::pin(async move {
            match next.run().await {
                Err(err) if !err.is_cancellation() => Err((self.mapper)(err)),
                other => other,
            }
        })
    }

    fn around_stream(&self, next: StreamNext) -> ReplyStream {
        let mapper = Arc::clone(&self.mapper);
        Box::pin(next.run().map(move |item| match item {
            Err(err) if !err.is_cancellation() => Err(mapper(err)),
            other => other,
        }))
    }
}

/// Retries failed unary calls with exponential backoff.
///
/// A call is retried while its error reports
/// [`is_retryable`](CallError::is_retryable) and the attempt budget is
/// not exhausted; the final attempt's result is returned as-is.
/// Re-running the tail of the chain is possible because [`Next`] is
/// `Copy`.
///
/// Streaming calls pass through untouched: a partially consumed stream
/// cannot be transparently replayed, so retrying it is the caller's
/// decision.
#[derive(Debug, Clone)]
pub struct Retry {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,

    /// Initial delay before the first retry.
    pub initial_delay: std::time::Duration,

    /// Maximum delay between retries.
    pub max_delay: std::time::Duration,

    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_millis(500),
            max_delay: std::time::Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl Retry {
    /// Creates a retry decoration with the given attempts and initial delay.
    pub fn new(max_attempts: u32, initial_delay: std::time::Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Default::default()
        }
    }

    /// The conventional provider id for this decoration kind.
    pub fn id() -> DecorationId {
        DecorationId::new("rpc_decor::decorations::Retry")
    }

    /// A singleton provider under the conventional id.
    pub fn provider(self) -> ProviderHandle {
        DecorationProvider::new(Self::id(), InitStrategy::Singleton, move || {
            Arc::new(self.clone())
        })
    }

    fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = std::time::Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

impl Decoration for Retry {
    fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
        Box::pin(async move {
            let mut attempt = 1;
            loop {
                let result = next.run().await;
                let retry = matches!(&result, Err(err) if err.is_retryable());
                // >= rather than ==: a zero attempt budget must still
                // terminate after the mandatory first attempt.
                if !retry || attempt >= self.max_attempts {
                    return result;
                }
                tokio::time::sleep(self.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
        })
    }

    fn around_stream(&self, next: StreamNext) -> ReplyStream {
        next.run()
    }
}

/// Verbosity knob for the [`Logging`] decoration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Basic logging: completion and duration.
    #[default]
    Info,
    /// Verbose logging: includes success/failure status.
    Debug,
    /// Trace logging: also logs call start.
    Trace,
}

/// Logs call lifecycle events using `tracing`.
///
/// Unary calls log on completion with their duration; streaming calls
/// log when the stream is opened and again when it completes. Requires
/// the `tracing` feature.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Default)]
pub struct Logging {
    /// Verbosity level for log output.
    pub level: LogLevel,
}

#[cfg(feature = "tracing")]
impl Logging {
    /// Creates a logging decoration with the given level.
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// The conventional provider id for this decoration kind.
    pub fn id() -> DecorationId {
        DecorationId::new("rpc_decor::decorations::Logging")
    }

    /// A singleton provider under the conventional id.
    pub fn provider(level: LogLevel) -> ProviderHandle {
        DecorationProvider::new(Self::id(), InitStrategy::Singleton, move || {
            Arc::new(Self { level })
        })
    }
}

#[cfg(feature = "tracing")]
impl Decoration for Logging {
    fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
        let level = self.level;
        Box::pin(async move {
            let start = std::time::Instant::now();

            if level == LogLevel::Trace {
                tracing::debug!("call starting");
            }

            let result = next.run().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match level {
                LogLevel::Info => {
                    tracing::info!(duration_ms, "call completed");
                }
                LogLevel::Debug | LogLevel::Trace => {
                    tracing::debug!(duration_ms, success = result.is_ok(), "call completed");
                }
            }

            result
        })
    }

    fn around_stream(&self, next: StreamNext) -> ReplyStream {
        if self.level == LogLevel::Trace {
            tracing::debug!("stream opened");
        }
        let start = std::time::Instant::now();
        on_stream_completion(next.run(), move || {
            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::info!(duration_ms, "stream completed");
        })
    }
}
