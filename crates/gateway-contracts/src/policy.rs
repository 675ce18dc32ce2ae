// Trust and tool-invocation policy DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Operators the Attribute Evaluator supports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

/// Action a trusted-data policy takes when its attribute path matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrustAction {
    MarkAsTrusted,
    BlockAlways,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrustedDataPolicy {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub attribute_path: String,
    pub operator: Operator,
    pub value: serde_json::Value,
    pub action: TrustAction,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTrustedDataPolicyRequest {
    pub tool_id: Uuid,
    pub attribute_path: String,
    pub operator: Operator,
    pub value: serde_json::Value,
    pub action: TrustAction,
    pub description: String,
}

/// Agents opt in to a trusted-data policy explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentTrustedDataPolicy {
    pub agent_id: Uuid,
    pub policy_id: Uuid,
}

/// Action a tool-invocation policy takes when its condition holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolInvocationAction {
    RequireTrustedContext,
    BlockAlways,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolInvocationPolicy {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub tool_name: String,
    /// Free-form condition expression evaluated against the proposed
    /// call's arguments; empty means "always applies".
    #[serde(default)]
    pub condition: Option<String>,
    pub action: ToolInvocationAction,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateToolInvocationPolicyRequest {
    pub agent_id: Uuid,
    pub tool_name: String,
    #[serde(default)]
    pub condition: Option<String>,
    pub action: ToolInvocationAction,
    pub description: String,
}

/// The classification the Trusted-Data Policy Engine assigns to a tool
/// result message. Exactly one of the three shapes holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct TrustClassification {
    pub trusted: bool,
    pub blocked: bool,
}

impl TrustClassification {
    pub const TRUSTED: Self = Self {
        trusted: true,
        blocked: false,
    };
    pub const BLOCKED: Self = Self {
        trusted: false,
        blocked: true,
    };
    pub const DEFAULT: Self = Self {
        trusted: false,
        blocked: false,
    };
}
