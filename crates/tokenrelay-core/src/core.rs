use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use tokenrelay_provider_core::{Provider, TokenSource};

use crate::handler::{generate_handler, panic_response, preflight_handler};

pub const DEFAULT_ROUTE: &str = "/api/generate";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub route: String,
    pub body_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            route: DEFAULT_ROUTE.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

pub struct CoreState {
    pub provider: Arc<dyn Provider>,
    pub tokens: Arc<dyn TokenSource>,
}

pub struct Core {
    state: Arc<CoreState>,
    config: CoreConfig,
}

impl Core {
    pub fn new(
        provider: Arc<dyn Provider>,
        tokens: Arc<dyn TokenSource>,
        config: CoreConfig,
    ) -> Self {
        Self {
            state: Arc::new(CoreState { provider, tokens }),
            config,
        }
    }

    pub fn route(&self) -> String {
        normalize_route(&self.config.route)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                &self.route(),
                post(generate_handler).options(preflight_handler),
            )
            .layer(DefaultBodyLimit::max(self.config.body_limit))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(
                TraceLayer::new_for_http()
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .with_state(self.state.clone())
    }
}

fn normalize_route(route: &str) -> String {
    let route = route.trim();
    if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    }
}
