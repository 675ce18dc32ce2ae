// Tool DTOs — a named capability the model may invoke, backed by an MCP
// endpoint. Tools are upserted by (agent_id, name); re-declaring an
// existing tool never changes its trust defaults.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tool {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    /// If false, this tool may not be called while `context_is_trusted`
    /// is false, regardless of any `require_trusted_context` policy.
    pub allow_usage_when_untrusted_data_is_present: bool,
    /// When true and no trust policy matches a result from this tool,
    /// downstream consumers treat the content as trusted anyway
    /// (see DESIGN.md for the "consult tool default" tradeoff).
    pub data_is_trusted_by_default: bool,
    /// MCP tool-execution HTTP endpoint: one per managed tool. Absent for
    /// tools a request merely declares without the gateway managing
    /// their execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpsertToolRequest {
    pub agent_id: Uuid,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub allow_usage_when_untrusted_data_is_present: bool,
    #[serde(default)]
    pub data_is_trusted_by_default: bool,
    #[serde(default)]
    pub mcp_endpoint: Option<String>,
}

/// A tool the model proposed to call, independent of provider wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A tool definition as sent to the upstream provider. Distinguishes
/// tools declared by the inbound request from tools the agent manages
/// (managed tools win on name collision when merged).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub managed: bool,
}

impl ToolDefinition {
    /// Merge `managed` over `requested`, keyed by name. Managed tools win
    /// on collision.
    pub fn merge(requested: Vec<ToolDefinition>, managed: Vec<ToolDefinition>) -> Vec<ToolDefinition> {
        let mut by_name: std::collections::HashMap<String, ToolDefinition> = requested
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        for tool in managed {
            by_name.insert(tool.name.clone(), tool);
        }
        let mut merged: Vec<ToolDefinition> = by_name.into_values().collect();
        merged.sort_by(|a, b| a.name.cmp(&b.name));
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, managed: bool) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("{name} description"),
            parameters: json!({}),
            managed,
        }
    }

    #[test]
    fn managed_tool_wins_on_name_collision() {
        let requested = vec![tool("search", false), tool("fetch", false)];
        let managed = vec![tool("search", true)];
        let merged = ToolDefinition::merge(requested, managed);

        let search = merged.iter().find(|t| t.name == "search").unwrap();
        assert!(search.managed);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn distinct_tools_are_all_kept() {
        let requested = vec![tool("a", false)];
        let managed = vec![tool("b", true)];
        let merged = ToolDefinition::merge(requested, managed);
        assert_eq!(merged.len(), 2);
    }
}
