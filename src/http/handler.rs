//! Placeholder request handler.
//!
//! Every request sleeps for the configured delay and then answers with a fixed
//! body, standing in for real work that takes a while to finish.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::any, Router};

use crate::config::HandlerConfig;
use crate::observability::metrics;

/// Slow "hello world" handler.
#[derive(Debug, Clone)]
pub struct SlowHandler {
    delay: Duration,
    body: Arc<str>,
}

impl SlowHandler {
    pub fn new(delay: Duration, body: impl Into<Arc<str>>) -> Self {
        Self {
            delay,
            body: body.into(),
        }
    }

    pub fn from_config(config: &HandlerConfig) -> Self {
        Self::new(config.delay(), config.body.as_str())
    }

    /// Router answering every path and method.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/", any(respond))
            .route("/{*path}", any(respond))
            .with_state(self)
    }
}

async fn respond(State(handler): State<SlowHandler>) -> String {
    metrics::record_request();
    tokio::time::sleep(handler.delay).await;
    handler.body.to_string()
}
