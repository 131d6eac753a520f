//! Axum HTTP handlers for the web server
//!
//! `GET /sse` opens a session stream, `POST /messages` feeds JSON-RPC messages
//! into it, and `/` plus `/health` describe the server.

use std::{collections::BTreeMap, convert::Infallible, time::Duration};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::domain::tools::build_tools_list;
use crate::errors::AppError;
use crate::mcp::server::handle_json_rpc_value;
use crate::mcp::session::{SessionEvent, SessionHandle, MESSAGES_PATH};
use crate::AppState;

pub const SSE_PATH: &str = "/sse";
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub tools: Vec<ToolSummary>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn root() -> Json<RootResponse> {
    let endpoints = BTreeMap::from([
        ("/", "Server information (this response)"),
        ("/health", "Liveness check"),
        (SSE_PATH, "Server-Sent Events endpoint for MCP connection"),
        (MESSAGES_PATH, "POST endpoint for MCP messages"),
    ]);
    let tools = build_tools_list()
        .into_iter()
        .map(|tool| ToolSummary {
            name: tool.name,
            description: tool.description,
        })
        .collect();

    Json(RootResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints,
        tools,
    })
}

pub async fn sse_endpoint(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (_, stream) = state.sessions.open()?;
    let events = stream.map(|event| Ok::<_, Infallible>(event.into_sse_event()));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

pub async fn messages_endpoint(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Result<Response, AppError> {
    let session = query
        .session_id
        .as_deref()
        .and_then(|id| state.sessions.get(id))
        .ok_or(AppError::NoActiveSession)?;

    let payload: Value = serde_json::from_slice(&body).map_err(|_| {
        AppError::bad_request("invalid_message", "message body must be valid JSON")
    })?;
    if payload.as_array().is_some_and(Vec::is_empty) {
        return Err(AppError::bad_request(
            "empty_batch",
            "message batch must not be empty",
        ));
    }

    spawn_dispatch(state, session, payload);
    Ok((StatusCode::ACCEPTED, "Accepted").into_response())
}

/// Processes a posted message off the request path and streams the responses
/// back over the session. Work is dropped as soon as the session closes.
fn spawn_dispatch(state: AppState, session: SessionHandle, payload: Value) {
    let cancel = session.cancellation();

    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(session_id = %session.id(), "session closed, dropping in-flight message");
            }
            responses = process_payload(&state, payload) => {
                for response in responses {
                    if !session.send(SessionEvent::Message(response.to_string())) {
                        debug!(session_id = %session.id(), "session stream gone, response discarded");
                        break;
                    }
                }
            }
        }
    });
}

async fn process_payload(state: &AppState, payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(batch) => {
            let mut responses = Vec::new();
            for item in batch {
                if let Some(response) = handle_json_rpc_value(state, item).await {
                    responses.push(response);
                }
            }
            responses
        }
        message => handle_json_rpc_value(state, message)
            .await
            .into_iter()
            .collect(),
    }
}
