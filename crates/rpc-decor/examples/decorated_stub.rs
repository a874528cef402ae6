//! Decorating a fake article stub end to end.
//!
//! Run with:
//! ```sh
//! cargo run --example decorated_stub
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};

use rpc_decor::decorations::{ExceptionMapping, LogLevel, Logging, Retry};
use rpc_decor::{CallError, GlobalConfig, Strategy, StubDecorator};

/// What a generated RPC stub for an article service might look like.
struct ArticleStub;

impl ArticleStub {
    async fn get_article(&self, id: u64) -> Result<String, CallError> {
        if id == 0 {
            return Err(CallError::Status {
                code: "invalid_argument".into(),
                message: "article id must be positive".into(),
                retryable: false,
            });
        }
        Ok(format!("article #{id}"))
    }

    fn list_articles(&self) -> impl Stream<Item = Result<String, CallError>> + Send {
        futures::stream::iter((1..=3).map(|id| Ok(format!("article #{id}"))))
    }
}

/// Hand-written adapter pairing the stub with its decorator.
struct ArticleClient {
    stub: ArticleStub,
    decorator: StubDecorator,
}

impl ArticleClient {
    fn new(global: Arc<GlobalConfig>) -> Result<Self, Box<dyn std::error::Error>> {
        let decorator = StubDecorator::builder()
            .global(global)
            // get_article gets a retry on top of the shared decorations.
            .call_strategy(
                "get_article",
                Strategy::append_all([
                    Retry::new(3, Duration::from_millis(100)).provider(),
                ]),
            )
            .build()?;

        Ok(Self {
            stub: ArticleStub,
            decorator,
        })
    }

    async fn get_article(&self, id: u64) -> Result<String, CallError> {
        self.decorator
            .unary("get_article", || self.stub.get_article(id))
            .await
    }

    fn list_articles(&self) -> impl Stream<Item = Result<String, CallError>> + Send {
        let stream = self.stub.list_articles();
        self.decorator.stream("list_articles", move || stream)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let global = Arc::new(
        GlobalConfig::new()
            .with_provider(Logging::provider(LogLevel::Debug))
            .with_provider(ExceptionMapping::provider(|err| match err {
                CallError::Transport { message, .. } => CallError::Status {
                    code: "unavailable".into(),
                    message,
                    retryable: true,
                },
                other => other,
            })),
    );

    let client = ArticleClient::new(global)?;

    let article = client.get_article(42).await?;
    println!("unary reply: {article}");

    match client.get_article(0).await {
        Ok(_) => unreachable!("id 0 is rejected"),
        Err(err) => println!("unary error: {err}"),
    }

    let mut stream = Box::pin(client.list_articles());
    while let Some(item) = stream.next().await {
        println!("stream item: {}", item?);
    }

    Ok(())
}
