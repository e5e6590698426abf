//! Built-in "Agent Tools" virtual server.
//!
//! Tools handled in-process by the gateway itself, with no child connection.
//! Tool calls whose name is not in the tool map fall back here; the virtual
//! server is exempt from per-server token scoping because it touches no
//! child state.

use mcphub_core::{GatewayError, McpTool, ToolCallResult};
use serde_json::{json, Value};

/// Reserved name of the virtual server. Never a valid child server name for
/// dispatch purposes.
pub const AGENT_TOOLS_SERVER: &str = "Agent Tools";

/// Tools the gateway itself answers.
pub fn tools() -> Vec<McpTool> {
    vec![
        McpTool::new("hub_ping")
            .with_description("Check that the gateway is reachable")
            .with_input_schema(json!({"type": "object", "properties": {}})),
        McpTool::new("hub_time")
            .with_description("Current gateway time as RFC 3339")
            .with_input_schema(json!({"type": "object", "properties": {}})),
    ]
}

/// Dispatch one in-process tool call.
pub fn call(name: &str, _arguments: &Value) -> Result<ToolCallResult, GatewayError> {
    match name {
        "hub_ping" => Ok(text_result("pong")),
        "hub_time" => Ok(text_result(&chrono::Utc::now().to_rfc3339())),
        other => Err(GatewayError::UnknownTarget(format!("tool: {other}"))),
    }
}

fn text_result(text: &str) -> ToolCallResult {
    ToolCallResult::ok(json!([{"type": "text", "text": text}]))
}
