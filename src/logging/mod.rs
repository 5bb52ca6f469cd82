//! Access log: one `slog` record per handled request.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use slog::{o, Discard, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};
use std::sync::Arc;
use std::time::Instant;

use crate::tracing::RequestId;

/// Configuration for setting up the logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub async_buffer_size: usize,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
        }
    }
}

/// Sets up a terminal logger behind an async drain
pub fn setup_logger(config: LoggerConfig) -> Logger {
    let decorator = {
        let builder = TermDecorator::new();
        let builder = if config.use_color {
            builder.force_color()
        } else {
            builder
        };
        builder.build()
    };

    let drain = FullFormat::new(decorator).build().fuse();

    let drain = Async::new(drain)
        .chan_size(config.async_buffer_size)
        .build()
        .fuse();

    Logger::root(drain, o!("service" => "catstore", "version" => env!("CARGO_PKG_VERSION")))
}

/// A logger that drops every record.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}

/// State for [`access_log_middleware`]
#[derive(Clone)]
pub struct AccessLog {
    logger: Logger,
}

impl AccessLog {
    pub fn new(logger: Logger) -> Arc<Self> {
        Arc::new(Self { logger })
    }
}

pub async fn access_log_middleware(
    State(state): State<Arc<AccessLog>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let response = next.run(req).await;
    let status = response.status().as_u16();
    let duration_ms: u128 = start_time.elapsed().as_millis();

    slog::info!(
        &state.logger,
        "HTTP request handled";
        "method" => method,
        "path" => path,
        "status" => status,
        "duration_ms" => duration_ms,
        "request_id" => request_id,
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "喵"
    }

    #[tokio::test]
    async fn access_log_passes_responses_through() {
        let state = AccessLog::new(discard_logger());
        let app = Router::new()
            .route("/", get(test_handler))
            .layer(axum::middleware::from_fn_with_state(
                state,
                access_log_middleware,
            ));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "喵");
    }
}
