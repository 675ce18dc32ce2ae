// Interaction DTOs — the atomic unit of audit.
//
// An Interaction is created exactly once per completed proxy request
// (including refusals) or per classified tool-result message; it is
// never mutated afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Interaction {
    pub id: Uuid,
    pub agent_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<Uuid>,
    /// e.g. "anthropic:messages", "openai:chat_completion", "<provider>:refusal".
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
    /// The role-tagged envelope this interaction is about, when it
    /// classifies a single tool-result message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    pub trusted: bool,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateInteraction {
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
}
