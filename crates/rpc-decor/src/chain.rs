//! Chain execution — running a call through an ordered decoration list.
//!
//! Given the resolved list for a call, the chain is the right-associated
//! composition `list[0] ( list[1] ( ... ( call ) ) )`: index 0 is
//! outermost, so its before-logic runs first, its after-logic runs last,
//! and it observes every failure raised beneath it. Order is exactly the
//! resolved list order, deterministic across invocations.
//!
//! # Entry points
//!
//! [`execute_unary`] and [`execute_stream`] are the typed entry points a
//! stub adapter composes into each wrapper method:
//!
//! ```rust
//! use rpc_decor::{execute_unary, CallError, ProviderHandle};
//!
//! async fn get_article(providers: &[ProviderHandle]) -> Result<String, CallError> {
//!     execute_unary(providers, || async { Ok("article".to_owned()) }).await
//! }
//! # let _ = get_article;
//! ```
//!
//! Responses travel through the chain as [`Reply`] (`Box<dyn Any +
//! Send>`); the entry points erase on the way in and downcast on the way
//! out. A decoration that short-circuits with a reply of the wrong type
//! surfaces as [`CallError::ResponseType`] at the boundary.
//!
//! # Empty lists
//!
//! An empty resolved list invokes the call directly, without erasure or
//! chain bookkeeping.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::decoration::{Decoration, ProviderHandle};
use crate::error::CallError;

/// A pinned, boxed, `Send` future. Keeps object-safe signatures readable.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased response traveling through the chain.
pub type Reply = Box<dyn Any + Send>;

/// What a unary chain link yields: an erased response or a call error.
pub type UnaryReply = Result<Reply, CallError>;

/// The erased stream flowing through a streaming chain.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<Reply, CallError>> + Send>>;

/// The typed stream handed back to the caller of [`execute_stream`].
pub type ResponseStream<Resp> = Pin<Box<dyn Stream<Item = Result<Resp, CallError>> + Send>>;

/// Object-safe form of the terminal unary call at the end of a chain.
trait UnaryCall: Send + Sync {
    fn invoke<'a>(&'a self) -> BoxFuture<'a, UnaryReply>;
}

/// Object-safe form of the terminal stream producer. Consumed once.
trait StreamCall: Send {
    fn invoke(self: Box<Self>) -> ReplyStream;
}

/// Handle to the remainder of a unary chain.
///
/// Awaiting [`run`](Next::run) either hands control to the next
/// decoration or, at the end of the list, invokes the call itself.
///
/// `Next` is `Copy` — cloning copies two references — which is what lets
/// a retry decoration run the tail of the chain more than once.
pub struct Next<'a> {
    decorations: &'a [Arc<dyn Decoration>],
    call: &'a dyn UnaryCall,
}

impl Clone for Next<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

// Copy is valid: both fields are references
impl Copy for Next<'_> {}

impl<'a> Next<'a> {
    /// Runs the rest of the chain, terminating in the real call.
    pub async fn run(self) -> UnaryReply {
        match self.decorations.split_first() {
            Some((first, rest)) => {
                first
                    .around_unary(Next {
                        decorations: rest,
                        call: self.call,
                    })
                    .await
            }
            None => self.call.invoke().await,
        }
    }
}

/// Handle to the remainder of a streaming chain.
///
/// Unlike [`Next`] this is an owned, one-shot value: composing a stream
/// consumes the handle. The composition itself is synchronous and lazy —
/// nothing is pulled from any stream until the consumer polls the result.
pub struct StreamNext {
    decorations: Vec<Arc<dyn Decoration>>,
    call: Box<dyn StreamCall>,
}

impl StreamNext {
    /// Composes the rest of the chain, terminating in the real stream.
    pub fn run(self) -> ReplyStream {
        let mut decorations = self.decorations;
        if decorations.is_empty() {
            self.call.invoke()
        } else {
            let first = decorations.remove(0);
            first.around_stream(StreamNext {
                decorations,
                call: self.call,
            })
        }
    }
}

struct ErasedUnary<'c, F, Fut, Resp> {
    call: F,
    _marker: PhantomData<(&'c (), fn() -> (Fut, Resp))>,
}

impl<'c, F, Fut, Resp> UnaryCall for ErasedUnary<'c, F, Fut, Resp>
where
    Resp: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, CallError>> + Send + 'c,
{
    fn invoke<'a>(&'a self) -> BoxFuture<'a, UnaryReply> {
        let fut = (self.call)();
        Box::pin(async move { fut.await.map(|resp| Box::new(resp) as Reply) })
    }
}

struct ErasedStream<F, S, Resp> {
    call: F,
    _marker: PhantomData<fn() -> (S, Resp)>,
}

impl<F, S, Resp> StreamCall for ErasedStream<F, S, Resp>
where
    Resp: Send + 'static,
    F: FnOnce() -> S + Send,
    S: Stream<Item = Result<Resp, CallError>> + Send + 'static,
{
    fn invoke(self: Box<Self>) -> ReplyStream {
        Box::pin((self.call)().map(|item| item.map(|resp| Box::new(resp) as Reply)))
    }
}

/// Executes a unary call through `providers`, outermost-first.
///
/// Decoration instances are retrieved once per invocation, honoring each
/// provider's [`InitStrategy`](crate::InitStrategy). With an empty list
/// the call is invoked directly.
///
/// The `'c` lifetime ties the call's future to whatever it borrows
/// (typically the stub held by the adapter); it is inferred at call
/// sites.
pub async fn execute_unary<'c, Resp, F, Fut>(
    providers: &[ProviderHandle],
    call: F,
) -> Result<Resp, CallError>
where
    Resp: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'c,
    Fut: Future<Output = Result<Resp, CallError>> + Send + 'c,
{
    if providers.is_empty() {
        return call().await;
    }

    let decorations: Vec<Arc<dyn Decoration>> =
        providers.iter().map(|p| p.decoration()).collect();
    let erased = ErasedUnary {
        call,
        _marker: PhantomData,
    };
    let next = Next {
        decorations: &decorations,
        call: &erased,
    };
    let reply = next.run().await?;
    reply
        .downcast::<Resp>()
        .map(|resp| *resp)
        .map_err(|_| CallError::ResponseType)
}

/// Composes a streaming call through `providers`, outermost-first.
///
/// The producer runs once, at composition time; the stream it returns is
/// only polled by the consumer, so no element is produced early. With an
/// empty list the producer's stream is returned directly.
pub fn execute_stream<Resp, F, S>(providers: &[ProviderHandle], call: F) -> ResponseStream<Resp>
where
    Resp: Send + 'static,
    F: FnOnce() -> S + Send + 'static,
    S: Stream<Item = Result<Resp, CallError>> + Send + 'static,
{
    if providers.is_empty() {
        return Box::pin(call());
    }

    let decorations: Vec<Arc<dyn Decoration>> =
        providers.iter().map(|p| p.decoration()).collect();
    let next = StreamNext {
        decorations,
        call: Box::new(ErasedStream {
            call,
            _marker: PhantomData,
        }),
    };
    Box::pin(next.run().map(|item| {
        item.and_then(|reply| {
            reply
                .downcast::<Resp>()
                .map(|resp| *resp)
                .map_err(|_| CallError::ResponseType)
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{DecorationId, DecorationProvider};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Pushes `<name>-before` / `<name>-after` around the inner chain.
    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Decoration for Recording {
        fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("{}-before", self.name));
                let reply = next.run().await;
                self.log.lock().unwrap().push(format!("{}-after", self.name));
                reply
            })
        }

        fn around_stream(&self, next: StreamNext) -> ReplyStream {
            self.log.lock().unwrap().push(format!("{}-wrap", self.name));
            next.run()
        }
    }

    fn recording_provider(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> ProviderHandle {
        let log = Arc::clone(log);
        DecorationProvider::per_call(DecorationId::new(name), move || {
            Arc::new(Recording {
                name,
                log: Arc::clone(&log),
            })
        })
    }

    #[tokio::test]
    async fn empty_list_invokes_call_directly() {
        let result: Result<String, CallError> =
            execute_unary(&[], || async { Ok("direct".to_owned()) }).await;
        assert_eq!(result.unwrap(), "direct");
    }

    #[tokio::test]
    async fn unary_order_is_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = [
            recording_provider("A", &log),
            recording_provider("B", &log),
        ];

        let calls = AtomicU32::new(0);
        let result: Result<u32, CallError> = execute_unary(&providers, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded, ["A-before", "B-before", "B-after", "A-after"]);
    }

    #[tokio::test]
    async fn unary_call_can_borrow_the_adapter() {
        // The call's future may borrow caller state, like a stub field.
        let stub = "borrowed-stub".to_owned();
        let stub_ref = &stub;
        let result: Result<String, CallError> =
            execute_unary(&[], || async move { Ok(stub_ref.to_owned()) }).await;
        assert_eq!(result.unwrap(), "borrowed-stub");
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_decorations_and_call() {
        struct ShortCircuit;

        impl Decoration for ShortCircuit {
            fn around_unary<'a>(&'a self, _next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
                Box::pin(async { Ok(Box::new("cached".to_owned()) as Reply) })
            }

            fn around_stream(&self, next: StreamNext) -> ReplyStream {
                next.run()
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = [
            DecorationProvider::per_call(DecorationId::new("short"), || Arc::new(ShortCircuit)),
            recording_provider("inner", &log),
        ];

        let calls = AtomicU32::new(0);
        let result: Result<String, CallError> = execute_unary(&providers, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("real".to_owned()) }
        })
        .await;

        assert_eq!(result.unwrap(), "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_circuit_with_wrong_type_reports_response_type() {
        struct WrongType;

        impl Decoration for WrongType {
            fn around_unary<'a>(&'a self, _next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
                Box::pin(async { Ok(Box::new(42_u32) as Reply) })
            }

            fn around_stream(&self, next: StreamNext) -> ReplyStream {
                next.run()
            }
        }

        let providers =
            [DecorationProvider::per_call(DecorationId::new("wrong"), || Arc::new(WrongType))];

        let result: Result<String, CallError> =
            execute_unary(&providers, || async { Ok("real".to_owned()) }).await;
        assert!(matches!(result, Err(CallError::ResponseType)));
    }

    #[tokio::test]
    async fn next_can_rerun_the_tail() {
        struct RunTwice;

        impl Decoration for RunTwice {
            fn around_unary<'a>(&'a self, next: Next<'a>) -> BoxFuture<'a, UnaryReply> {
                Box::pin(async move {
                    let _ = next.run().await;
                    next.run().await
                })
            }

            fn around_stream(&self, next: StreamNext) -> ReplyStream {
                next.run()
            }
        }

        let providers =
            [DecorationProvider::per_call(DecorationId::new("twice"), || Arc::new(RunTwice))];

        let calls = AtomicU32::new(0);
        let result: Result<u32, CallError> = execute_unary(&providers, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(n) }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_propagate_through_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = [recording_provider("A", &log)];

        let result: Result<u32, CallError> = execute_unary(&providers, || async {
            Err(CallError::Status {
                code: "internal".into(),
                message: "boom".into(),
                retryable: false,
            })
        })
        .await;

        assert!(matches!(result, Err(CallError::Status { .. })));
        // The decoration still observed before and after.
        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded, ["A-before", "A-after"]);
    }

    #[tokio::test]
    async fn empty_list_returns_the_stream_directly() {
        let stream: ResponseStream<u32> =
            execute_stream(&[], || futures::stream::iter([Ok(1), Ok(2)]));
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn stream_composition_is_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = [
            recording_provider("A", &log),
            recording_provider("B", &log),
        ];

        let stream: ResponseStream<u32> =
            execute_stream(&providers, || futures::stream::iter([Ok(1), Ok(2), Ok(3)]));
        let values: Vec<u32> = stream.map(Result::unwrap).collect().await;

        assert_eq!(values, [1, 2, 3]);
        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded, ["A-wrap", "B-wrap"]);
    }

    #[tokio::test]
    async fn stream_elements_are_not_produced_until_polled() {
        let produced = Arc::new(AtomicU32::new(0));
        let counting = Arc::clone(&produced);

        let log = Arc::new(Mutex::new(Vec::new()));
        let providers = [recording_provider("A", &log)];

        let mut stream: ResponseStream<u32> = execute_stream(&providers, move || {
            futures::stream::iter(0..3).map(move |i| {
                counting.fetch_add(1, Ordering::SeqCst);
                Ok(i)
            })
        });

        // Composed, wrapped, but nothing pulled yet.
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(produced.load(Ordering::SeqCst), 0);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, 0);
        assert_eq!(produced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_error_passes_through() {
        let stream: ResponseStream<u32> = execute_stream(&[], || {
            futures::stream::iter([Ok(1), Err(CallError::Cancelled)])
        });
        let collected: Vec<_> = stream.collect().await;
        assert!(collected[0].is_ok());
        assert!(matches!(collected[1], Err(CallError::Cancelled)));
    }
}
