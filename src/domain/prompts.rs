//! Prompt templates exposed via Model Context Protocol

use rust_mcp_sdk::schema::{ContentBlock, GetPromptRequestParams, PromptMessage, Role, TextContent};
use serde_json::{json, Value};

use crate::domain::tools::CHARACTER_TOOL_NAME;
use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result, INVALID_PARAMS};

pub const STARWARS_PROMPT_NAME: &str = "starwars";
pub const PLANET_TOOL_NAME: &str = "buscar_planeta_por_nome";
pub const STARSHIP_TOOL_NAME: &str = "buscar_nave_por_nome";

const PROMPT_DESCRIPTION: &str = "Orienta o assistente a consultar o universo Star Wars";

pub fn prompt_text(query: &str) -> String {
    format!(
        "Instruções: Você é um assistente de consulta ao universo Star Wars.\n\n\
         Quando eu solicitar informações sobre um personagem, use a ferramenta \"{CHARACTER_TOOL_NAME}\" fornecendo o nome informado.\n\n\
         Quando eu solicitar informações sobre um planeta, use a ferramenta \"{PLANET_TOOL_NAME}\" fornecendo o nome informado.\n\n\
         Quando eu solicitar informações sobre uma nave, use a ferramenta \"{STARSHIP_TOOL_NAME}\" fornecendo o nome informado.\n\n\
         Minha consulta é: {query}"
    )
}

pub fn build_prompt(query: &str) -> PromptMessage {
    PromptMessage {
        content: ContentBlock::from(TextContent::new(prompt_text(query), None, None)),
        role: Role::User,
    }
}

pub fn build_prompts_list() -> Value {
    json!({
        "prompts": [
            {
                "name": STARWARS_PROMPT_NAME,
                "description": PROMPT_DESCRIPTION,
                "arguments": [
                    {
                        "name": "query",
                        "description": "Consulta do usuário",
                        "required": true
                    }
                ]
            }
        ]
    })
}

pub fn handle_prompts_get(id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let prompt_get: GetPromptRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    if prompt_get.name != STARWARS_PROMPT_NAME {
        return json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": "prompt_not_found",
                "message": "unknown prompt name",
                "details": {
                    "name": prompt_get.name,
                },
            })),
        );
    }

    let Some(query) = prompt_get
        .arguments
        .as_ref()
        .and_then(|arguments| arguments.get("query"))
    else {
        return json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": "missing_argument",
                "message": "prompt argument query is required",
                "details": {},
            })),
        );
    };

    json_rpc_result(
        id,
        json!({
            "description": PROMPT_DESCRIPTION,
            "messages": [build_prompt(query)],
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ends_with_query_and_keeps_preamble() {
        let message = build_prompt("Find Leia");
        let value = serde_json::to_value(&message).expect("serialize");
        let text = value["content"]["text"].as_str().expect("text content");

        assert_eq!(value["role"], "user");
        assert_eq!(value["content"]["type"], "text");
        assert!(text.starts_with("Instruções: Você é um assistente de consulta"));
        assert!(text.ends_with("Find Leia"));
    }

    #[test]
    fn prompt_names_all_three_tools() {
        let text = prompt_text("x");
        assert!(text.contains("\"buscar_personagem_por_nome\""));
        assert!(text.contains("\"buscar_planeta_por_nome\""));
        assert!(text.contains("\"buscar_nave_por_nome\""));
    }

    #[test]
    fn empty_query_still_yields_instructions() {
        let text = prompt_text("");
        assert!(text.ends_with("Minha consulta é: "));
    }

    #[test]
    fn prompts_get_returns_single_user_message() {
        let response = handle_prompts_get(
            Some(json!(7)),
            Some(json!({"name": "starwars", "arguments": {"query": "Quem é Yoda?"}})),
        );

        assert_eq!(response["id"], 7);
        let messages = response["result"]["messages"]
            .as_array()
            .expect("messages array");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert!(messages[0]["content"]["text"]
            .as_str()
            .expect("text")
            .ends_with("Minha consulta é: Quem é Yoda?"));
    }

    #[test]
    fn prompts_get_requires_query_argument() {
        let response = handle_prompts_get(Some(json!(1)), Some(json!({"name": "starwars"})));
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["code"], "missing_argument");
    }

    #[test]
    fn prompts_get_rejects_unknown_prompt() {
        let response = handle_prompts_get(
            Some(json!(1)),
            Some(json!({"name": "planets", "arguments": {"query": "Hoth"}})),
        );
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["code"], "prompt_not_found");
    }

    #[test]
    fn prompts_list_advertises_starwars_prompt() {
        let list = build_prompts_list();
        assert_eq!(list["prompts"][0]["name"], "starwars");
        assert_eq!(list["prompts"][0]["arguments"][0]["name"], "query");
        assert_eq!(list["prompts"][0]["arguments"][0]["required"], true);
    }
}
