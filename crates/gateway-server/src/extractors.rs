//! Custom Axum extractors for the gateway.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    Form,
};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::debug;

/// Header carrying the request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extract request ID from headers or generate one
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(request_id_from_headers(&parts.headers)))
    }
}

/// Read a caller-supplied request id, generating one when absent
pub fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from)
}

#[derive(Debug, Deserialize)]
struct PromptFields {
    prompt: Option<String>,
}

/// The raw `prompt` parameter, untrimmed.
///
/// Read from the query string first, then from an
/// `application/x-www-form-urlencoded` body. A missing or unreadable
/// parameter yields `None`; validation happens in the pipeline.
#[derive(Debug, Clone)]
pub struct PromptParam(pub Option<String>);

#[async_trait]
impl<S> FromRequest<S> for PromptParam
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Ok(axum::extract::Query(fields)) =
            axum::extract::Query::<PromptFields>::try_from_uri(req.uri())
        {
            if fields.prompt.is_some() {
                return Ok(Self(fields.prompt));
            }
        }

        if !is_form(req.headers()) {
            return Ok(Self(None));
        }

        match Form::<PromptFields>::from_request(req, state).await {
            Ok(Form(fields)) => Ok(Self(fields.prompt)),
            Err(rejection) => {
                debug!(error = %rejection, "Unreadable form body");
                Ok(Self(None))
            }
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}
