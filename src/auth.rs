use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use subtle::ConstantTimeEq;

use crate::{errors::AppError, AppState};

pub const API_KEY_HEADERS: [&str; 2] = ["x-api-key", "apikey"];

/// Guards the MCP transport routes when an API key is configured. Without a
/// configured key the request passes through untouched and no header is read.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = provided_api_key(request.headers());

    match provided {
        None => Err(AppError::unauthorized(
            "missing_api_key",
            "missing X-API-Key, Apikey or bearer authorization header",
        )),
        Some(key) if keys_match(&key, expected) => Ok(next.run(request).await),
        Some(_) => Err(AppError::unauthorized("invalid_api_key", "invalid api key")),
    }
}

/// A malformed or non-bearer `Authorization` header counts as absent.
fn provided_api_key(headers: &HeaderMap) -> Option<String> {
    header_api_key(headers).or_else(|| {
        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_string())
    })
}

fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn header_api_key(headers: &HeaderMap) -> Option<String> {
    API_KEY_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
