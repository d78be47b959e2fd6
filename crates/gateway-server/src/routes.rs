//! Route definitions for the gateway API.

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{extractors::REQUEST_ID_HEADER, handlers, middleware, state::AppState};

/// Create the main API router.
///
/// The gateway route answers `POST` with a generation stream and `GET` with
/// backend health; both sit behind the engine gate. `/metrics` is always
/// available.
pub fn create_router(state: AppState) -> Router {
    let route_path = state.config.server.route_path.clone();
    let body_limit = state.config.server.body_limit;

    let gateway = Router::new()
        .route(
            &route_path,
            get(handlers::backend_health).post(handlers::generate),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::engine_gate,
        ));

    Router::new()
        .merge(gateway)
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Apply middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        }))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        // Add state
        .with_state(state)
}
