use std::sync::Arc;

use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod swapi_client;

use mcp::session::{SessionRegistry, MESSAGES_PATH};
use swapi_client::CharacterLookup;

#[derive(Clone)]
pub struct AppState {
    pub api_key: Option<Arc<str>>,
    pub sessions: SessionRegistry,
    pub character_lookup: Arc<dyn CharacterLookup>,
}

impl AppState {
    pub fn new(api_key: Option<String>, character_lookup: Arc<dyn CharacterLookup>) -> Self {
        Self {
            api_key: api_key.map(Arc::<str>::from),
            sessions: SessionRegistry::new(),
            character_lookup,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let transport = Router::new()
        .route(http::handlers::SSE_PATH, get(http::handlers::sse_endpoint))
        .route(MESSAGES_PATH, post(http::handlers::messages_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(http::handlers::root))
        .route("/health", get(http::handlers::health))
        .merge(transport)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .layer(cors_layer())
        .with_state(state)
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false)
}
