// Database row shapes (internal, converted to gateway-contracts DTOs at
// the repository boundary). Enum columns are stored as TEXT and parsed
// after fetch rather than via a custom `sqlx::Type`, matching how the
// teacher keeps e.g. `AgentRow.status` as a plain `String`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct AgentRow {
    pub id: Uuid,
    pub name: String,
    pub labels: serde_json::Value,
    pub team_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TeamRow {
    pub id: Uuid,
    pub name: String,
    pub org_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrganizationRow {
    pub id: Uuid,
    pub name: String,
    pub limit_cleanup_interval: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PromptRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub r#type: String,
    pub content: String,
    pub version: i32,
    pub parent_prompt_id: Option<Uuid>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AgentPromptRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub prompt_id: Uuid,
    pub order: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct PromptTypeRow {
    pub id: Uuid,
    pub r#type: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ToolRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub allow_usage_when_untrusted_data_is_present: bool,
    pub data_is_trusted_by_default: bool,
    pub mcp_endpoint: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TrustedDataPolicyRow {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub attribute_path: String,
    pub operator: String,
    pub value: serde_json::Value,
    pub action: String,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ToolInvocationPolicyRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub tool_name: String,
    pub condition: Option<String>,
    pub action: String,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct InteractionRow {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub chat_id: Option<Uuid>,
    pub r#type: String,
    pub request: Option<serde_json::Value>,
    pub response: Option<serde_json::Value>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub content: Option<serde_json::Value>,
    pub trusted: bool,
    pub blocked: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LimitRow {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub limit_type: String,
    pub model: Option<String>,
    pub limit_value: f64,
    pub current_usage_tokens_in: i64,
    pub current_usage_tokens_out: i64,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TokenPriceRow {
    pub model: String,
    pub price_per_million_input: f64,
    pub price_per_million_output: f64,
}
