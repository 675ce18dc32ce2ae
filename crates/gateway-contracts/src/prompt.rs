// Prompt DTOs.
//
// Invariant: for any (org_id, name, type) triple, exactly one
// row has is_active = true. Updating a prompt deactivates the current
// row and inserts a new one with version + 1, parent_prompt_id = old.id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    System,
    Regular,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Prompt {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub r#type: PromptType,
    pub content: String,
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_prompt_id: Option<Uuid>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePromptRequest {
    pub org_id: Uuid,
    pub name: String,
    pub r#type: PromptType,
    pub content: String,
    pub created_by: Uuid,
}

/// Updating a prompt always produces a new version; there is no in-place edit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePromptRequest {
    pub content: String,
    pub created_by: Uuid,
}

/// One entry in an agent's ordered prompt set. The system prompt, if
/// present, is written with order = 0; regular prompts follow at
/// order = i + 1 in input order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentPrompt {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub prompt_id: Uuid,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReplaceAgentPromptsRequest {
    /// Prompt ids in the order they should be attached. The repository
    /// determines order = 0 vs 1..n from each prompt's `type`.
    pub prompt_ids: Vec<Uuid>,
}
