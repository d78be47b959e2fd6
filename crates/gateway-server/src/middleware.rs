//! Request middleware.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{
    error::ApiError,
    extractors::{request_id_from_headers, REQUEST_ID_HEADER},
    state::AppState,
};

/// Ensure every request and response carries an `x-request-id` header
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request_id_from_headers(request.headers());
    let value = HeaderValue::from_str(&id).ok();

    if let Some(value) = &value {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let mut response = next.run(request).await;
    if let Some(value) = value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Reject gateway requests while the engine is switched off
pub async fn engine_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.gateway.enabled {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request, engine disabled"
        );
        return ApiError::Disabled.into_response();
    }
    next.run(request).await
}
