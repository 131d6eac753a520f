//! The central Model Context Protocol engine
//!
//! Decodes JSON-RPC messages posted to a session, negotiates the protocol
//! version on `initialize`, and routes tool and prompt methods to the domain
//! layer.

use rust_mcp_sdk::schema::{
    CallToolRequest, GetPromptRequest, Implementation, InitializeRequest, InitializeResult,
    JsonrpcMessage, JsonrpcRequest, ListPromptsRequest, ListToolsRequest, ListToolsResult,
    PingRequest, ServerCapabilities, ServerCapabilitiesPrompts, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::{
    prompts::{build_prompts_list, handle_prompts_get},
    tools::{build_tools_list, handle_tools_call},
};
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
    request_id_to_value, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};
use crate::{errors::AppError, AppState};

/// Revision spoken by the HTTP+SSE transport; offered to clients that ask for
/// anything we do not know.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];

const SERVER_INSTRUCTIONS: &str =
    "Use buscar_personagem_por_nome para consultar personagens de Star Wars pelo nome.";

pub async fn handle_json_rpc_value(state: &AppState, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            if let Err(error_response) = validate_request_shape(&request) {
                return Some(error_response);
            }

            let request_id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(
                    Some(request_id),
                    INVALID_REQUEST,
                    "Invalid Request",
                ));
            }

            Some(
                handle_json_rpc_request(
                    state,
                    Some(request_id),
                    request.method,
                    request.params.map(Value::Object),
                )
                .await,
            )
        }
        JsonrpcMessage::Notification(notification) => {
            debug!(method = %notification.method, "mcp notification received");
            None
        }
        // Responses to server-initiated requests; this server never sends any.
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => None,
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "prompts/get" => serde_json::from_value::<GetPromptRequest>(payload).is_ok(),
        "prompts/list" => serde_json::from_value::<ListPromptsRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, INVALID_PARAMS, "Invalid params"))
    }
}

pub async fn handle_json_rpc_request(
    state: &AppState,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let audit_params = redact_audit_params(params.as_ref());

    let response = match method.as_str() {
        "initialize" => match negotiate_protocol_version(params.as_ref()) {
            Ok(protocol_version) => json_rpc_result(
                id,
                serde_json::to_value(initialize_result(protocol_version))
                    .expect("initialize result serialization"),
            ),
            Err(err) => app_error_to_json_rpc(id, err),
        },
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => json_rpc_result(
            id,
            serde_json::to_value(ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: build_tools_list(),
            })
            .expect("tools list result serialization"),
        ),
        "tools/call" => handle_tools_call(state, id, params).await,
        "prompts/list" => json_rpc_result(id, build_prompts_list()),
        "prompts/get" => handle_prompts_get(id, params),
        _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

fn initialize_result(protocol_version: &str) -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            prompts: Some(ServerCapabilitiesPrompts {
                list_changed: Some(false),
            }),
            resources: None,
            ..Default::default()
        },
        protocol_version: protocol_version.to_string(),
        instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        meta: None,
    }
}

pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    Ok(SUPPORTED_PROTOCOL_VERSIONS
        .into_iter()
        .find(|version| *version == offered_version)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "apikey" | "api_key" | "x-api-key"
    ) || ["token", "secret", "password", "credential"]
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::swapi_client::{CharacterLookup, LookupError};

    struct StaticLookup;

    #[async_trait]
    impl CharacterLookup for StaticLookup {
        async fn search_people(&self, name: &str) -> Result<String, LookupError> {
            Ok(format!(r#"{{"query":"{name}"}}"#))
        }
    }

    fn state() -> AppState {
        AppState::new(None, Arc::new(StaticLookup))
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "buscar_personagem_por_nome",
            "arguments": {
                "nome": "Luke",
                "apikey": "should-not-appear",
                "access_token": "should-not-appear",
                "nested": {
                    "secret": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("buscar_personagem_por_nome"));
        assert_eq!(redacted["arguments"]["nome"], json!("Luke"));
        assert_eq!(redacted["arguments"]["apikey"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["access_token"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"]["secret"],
            json!("[REDACTED]")
        );
    }

    #[test]
    fn negotiate_protocol_version_echoes_supported_version() {
        let params = json!({ "protocolVersion": "2025-03-26" });
        let version = negotiate_protocol_version(Some(&params)).expect("supported version");
        assert_eq!(version, "2025-03-26");
    }

    #[test]
    fn negotiate_protocol_version_falls_back_for_unknown_version() {
        let params = json!({ "protocolVersion": "2099-01-01" });
        let version = negotiate_protocol_version(Some(&params)).expect("fallback version");
        assert_eq!(version, DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn negotiate_protocol_version_requires_version() {
        let error = negotiate_protocol_version(Some(&json!({}))).expect_err("missing version");
        assert!(error.to_string().contains("bad request"));
    }

    #[tokio::test]
    async fn initialize_advertises_tools_and_prompts() {
        let response = handle_json_rpc_value(
            &state(),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "clientInfo": {"name": "test-client", "version": "1.0.0"},
                    "capabilities": {}
                }
            }),
        )
        .await
        .expect("initialize response");

        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert!(response["result"]["capabilities"]["tools"].is_object());
        assert!(response["result"]["capabilities"]["prompts"].is_object());
        assert!(response["result"]["capabilities"]["resources"].is_null());
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let response = handle_json_rpc_value(
            &state(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn non_object_payload_is_invalid_request() {
        let response = handle_json_rpc_value(&state(), json!("hello"))
            .await
            .expect("error response");
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = handle_json_rpc_value(
            &state(),
            json!({"jsonrpc": "2.0", "id": 9, "method": "resources/list"}),
        )
        .await
        .expect("error response");
        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn tools_call_routes_to_character_lookup() {
        let response = handle_json_rpc_value(
            &state(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "buscar_personagem_por_nome", "arguments": {"nome": "Leia"}}
            }),
        )
        .await
        .expect("tool response");

        assert_eq!(
            response["result"]["content"][0]["text"],
            r#"Personagem consultado: {"query":"Leia"}"#
        );
    }

    #[tokio::test]
    async fn tools_call_without_name_argument_is_invalid_params() {
        let response = handle_json_rpc_value(
            &state(),
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "buscar_personagem_por_nome", "arguments": {}}
            }),
        )
        .await
        .expect("error response");
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn tools_call_unknown_tool_is_not_found() {
        let response = handle_json_rpc_value(
            &state(),
            json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": {"name": "buscar_planeta_por_nome", "arguments": {"nome": "Hoth"}}
            }),
        )
        .await
        .expect("error response");
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["data"]["code"], "tool_not_found");
    }
}
