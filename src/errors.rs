use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub const NO_ACTIVE_SESSION_MESSAGE: &str = "No active transport connection";
pub const TRANSPORT_CONNECT_MESSAGE: &str = "Error connecting transport";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: &'static str,
    },
    #[error("unauthorized: {message}")]
    Unauthorized {
        code: &'static str,
        message: &'static str,
    },
    #[error("no active transport connection")]
    NoActiveSession,
    #[error("failed to connect transport: {0}")]
    TransportConnect(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self::BadRequest { code, message }
    }

    pub fn unauthorized(code: &'static str, message: &'static str) -> Self {
        Self::Unauthorized { code, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, code, message.to_string())
            }
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, code, message.to_string())
            }
            // MCP SSE clients match on these bodies verbatim.
            Self::NoActiveSession => {
                tracing::warn!("message posted without an active transport connection");
                return (StatusCode::BAD_REQUEST, NO_ACTIVE_SESSION_MESSAGE).into_response();
            }
            Self::TransportConnect(reason) => {
                tracing::error!(error = %reason, "error connecting transport");
                return (StatusCode::INTERNAL_SERVER_ERROR, TRANSPORT_CONNECT_MESSAGE)
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            }),
        )
            .into_response()
    }
}
