//! JSON-RPC dispatch for the aggregated MCP endpoint.
//!
//! One envelope shape serves both the streamable HTTP endpoint and the
//! SSE message endpoint. Notifications (no id) produce no response.
//! Downstream error payloads pass through with their original code,
//! message and data; authorization failures always surface as the generic
//! `-32600 invalid request`.

use mcphub_core::GatewayError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// MCP protocol revision this gateway speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

enum RpcError {
    MethodNotFound(String),
    Gateway(GatewayError),
}

impl From<GatewayError> for RpcError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

/// Dispatch one JSON-RPC request. Returns `None` for notifications.
pub async fn dispatch(state: &AppState, token: Option<&str>, raw: Value) -> Option<Value> {
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => {
            return Some(error_response(
                Value::Null,
                -32700,
                &format!("parse error: {err}"),
                None,
            ));
        }
    };

    // Notifications carry no id and expect no response. The only one the
    // gateway receives is `notifications/initialized`, which needs no work.
    let id = request.id?;

    match run(state, token, &request.method, request.params).await {
        Ok(result) => Some(json!({"jsonrpc": "2.0", "id": id, "result": result})),
        Err(err) => {
            let (code, message, data) = error_parts(err);
            Some(error_response(id, code, &message, data))
        }
    }
}

async fn run(
    state: &AppState,
    token: Option<&str>,
    method: &str,
    params: Value,
) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "mcphub",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {
                "tools": {},
                "resources": {},
                "prompts": {},
            },
        })),

        "ping" => Ok(json!({})),

        "tools/list" => {
            let services = state.context.services().await?;
            let tools = services.aggregator.list_tools(token).await?;
            Ok(json!({"tools": tools}))
        }

        "tools/call" => {
            let params: ToolCallParams = parse_params(params)?;
            let services = state.context.services().await?;
            let result = services
                .aggregator
                .call_tool(token, &params.name, params.arguments.unwrap_or(json!({})))
                .await?;
            Ok(json!({"content": result.content, "isError": result.is_error}))
        }

        "resources/list" => {
            let services = state.context.services().await?;
            let resources = services.aggregator.list_resources(token).await?;
            Ok(json!({"resources": resources}))
        }

        "resources/read" => {
            let params: ReadResourceParams = parse_params(params)?;
            let services = state.context.services().await?;
            let result = services.aggregator.read_resource(token, &params.uri).await?;
            Ok(json!({"contents": result.contents}))
        }

        "resources/templates/list" => {
            let services = state.context.services().await?;
            let templates = services.aggregator.list_resource_templates(token).await?;
            Ok(json!({"resourceTemplates": templates}))
        }

        "prompts/list" => {
            let services = state.context.services().await?;
            let prompts = services.aggregator.list_prompts(token).await?;
            Ok(json!({"prompts": prompts}))
        }

        "prompts/get" => {
            let params: GetPromptParams = parse_params(params)?;
            let services = state.context.services().await?;
            let body = services
                .aggregator
                .get_prompt(token, &params.name, params.arguments)
                .await?;
            Ok(body)
        }

        other => Err(RpcError::MethodNotFound(other.to_string())),
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params)
        .map_err(|err| RpcError::Gateway(GatewayError::InvalidParams(err.to_string())))
}

fn error_parts(err: RpcError) -> (i64, String, Option<Value>) {
    match err {
        RpcError::MethodNotFound(method) => {
            (-32601, format!("method not found: {method}"), None)
        }
        RpcError::Gateway(err) => match err {
            // Uniform rejection: the code and message never reveal which
            // check failed or whether the target exists.
            GatewayError::Auth(auth) => (-32600, auth.to_string(), None),
            GatewayError::UnknownTarget(msg) => (-32602, format!("unknown target: {msg}"), None),
            GatewayError::InvalidParams(msg) => (-32602, msg, None),
            GatewayError::Downstream {
                code,
                message,
                data,
            } => (code, message, data),
            GatewayError::NotRunning(name) => (-32000, format!("server not running: {name}"), None),
            GatewayError::Connection(conn) => (-32000, conn.to_string(), None),
            GatewayError::Unavailable(msg) => (-32000, msg, None),
            GatewayError::Repository(repo) => (-32603, repo.to_string(), None),
        },
    }
}

fn error_response(id: Value, code: i64, message: &str, data: Option<Value>) -> Value {
    let mut error = json!({"code": code, "message": message});
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({"jsonrpc": "2.0", "id": id, "error": error})
}
