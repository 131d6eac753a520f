//! Interactive tools exposed via Model Context Protocol
//!
//! Provides the `buscar_personagem_por_nome` character lookup. The tool never
//! fails at the protocol level: upstream problems come back as a text result
//! flagged with `isError`.

use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::mcp::rpc::{
    json_rpc_error, json_rpc_error_with_data, json_rpc_result, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use crate::{swapi_client::CharacterLookup, AppState};

pub const CHARACTER_TOOL_NAME: &str = "buscar_personagem_por_nome";
pub const SUCCESS_PREFIX: &str = "Personagem consultado: ";
pub const FAILURE_PREFIX: &str = "Erro na consulta: ";
pub const UNKNOWN_ERROR: &str = "Erro desconhecido";

#[macros::mcp_tool(
    name = "buscar_personagem_por_nome",
    description = "Busca um personagem de Star Wars pelo nome"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CharacterLookupTool {
    /// Nome de um personagem de starwars
    pub nome: String,
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Success { text: String },
    Failure { message: String },
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Success { text } => text,
            Self::Failure { message } => message,
        }
    }

    pub fn into_call_tool_result(self) -> CallToolResult {
        let is_error = (!self.is_success()).then_some(true);
        let text = match self {
            Self::Success { text } => text,
            Self::Failure { message } => message,
        };

        CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(text, None, None))],
            is_error,
            meta: None,
            structured_content: None,
        }
    }
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![CharacterLookupTool::tool()]
}

pub async fn invoke(lookup: &dyn CharacterLookup, name: &str) -> ToolResult {
    match lookup.search_people(name).await {
        Ok(body) => ToolResult::Success {
            text: format!("{SUCCESS_PREFIX}{body}"),
        },
        Err(err) => {
            warn!(error = %err, "character lookup failed");
            let description = if err.message().trim().is_empty() {
                UNKNOWN_ERROR
            } else {
                err.message()
            };
            ToolResult::Failure {
                message: format!("{FAILURE_PREFIX}{description}"),
            }
        }
    }
}

pub async fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match tool_call.name.as_str() {
        CHARACTER_TOOL_NAME => {
            let request: CharacterLookupTool =
                match serde_json::from_value(json!(tool_call.arguments.unwrap_or_default())) {
                    Ok(value) => value,
                    Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
                };

            let result = invoke(state.character_lookup.as_ref(), &request.nome).await;
            json_rpc_result(
                id,
                serde_json::to_value(result.into_call_tool_result())
                    .expect("character lookup tool result serialization"),
            )
        }
        _ => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": tool_call.name,
                },
            })),
        ),
    }
}
