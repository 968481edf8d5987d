//! API middleware stack

mod api_key;

pub use api_key::{extract_api_key, require_api_key, validate_api_key, API_KEY_HEADER};

use crate::server::AppState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Tracing, timeout and CORS for the whole application
pub fn apply_middleware(router: Router, state: &AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
            .layer(TimeoutLayer::new(state.config.request_timeout()))
            .layer(cors),
    )
}
