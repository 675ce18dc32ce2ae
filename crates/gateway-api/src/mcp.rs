// MCP tool execution client: one HTTP endpoint per managed tool. Each
// managed tool's `mcp_endpoint` is POSTed the call arguments, and the
// JSON (or plain-text) body becomes the tool result.

use async_trait::async_trait;
use gateway_contracts::ToolCall;
use reqwest::Client;
use serde_json::Value;

#[async_trait]
pub trait McpToolClient: Send + Sync {
    async fn execute(&self, endpoint: &str, call: &ToolCall) -> Result<String, String>;
}

pub struct HttpMcpToolClient {
    client: Client,
}

impl HttpMcpToolClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for HttpMcpToolClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpToolClient for HttpMcpToolClient {
    async fn execute(&self, endpoint: &str, call: &ToolCall) -> Result<String, String> {
        let response = self
            .client
            .post(endpoint)
            .json(&call.arguments)
            .send()
            .await
            .map_err(|e| format!("mcp tool '{}' unreachable: {e}", call.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("mcp tool '{}' returned {status}: {body}", call.name));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("mcp tool '{}' returned malformed JSON: {e}", call.name))?;

        Ok(body.to_string())
    }
}
