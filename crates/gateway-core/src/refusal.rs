// Shared refusal payload shape emitted by the Tool-Invocation Policy
// Evaluator and Quota Enforcement — both produce
// the same `[auditRefusal, userRefusal]` pair on the first matching rule.

use serde::{Deserialize, Serialize};

/// Structured payload wrapping the user-facing refusal in metadata tags
/// suitable for inclusion in a persisted Interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRefusal {
    pub refusal_type: String,
    pub tool: Option<String>,
    pub reason: String,
    pub tagged_body: String,
}

/// Plain-text message suitable to stream to the end user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRefusal {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefusalPair {
    pub audit: AuditRefusal,
    pub user: UserRefusal,
}

impl RefusalPair {
    /// Build a refusal pair tagged `type="tool_invocation"`.
    pub fn tool_invocation(tool: &str, policy_id: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::new("tool_invocation", Some(tool.to_string()), policy_id.to_string(), message.into())
    }

    /// Build a refusal pair tagged `type="token_cost"`.
    pub fn token_cost(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("token_cost", None, reason.into(), message.into())
    }

    fn new(refusal_type: &str, tool: Option<String>, reason: String, message: String) -> Self {
        let tagged_body = match &tool {
            Some(tool) => format!(
                r#"<archestra-refusal type="{refusal_type}" tool="{tool}" reason="{reason}">{message}</archestra-refusal>"#
            ),
            None => format!(
                r#"<archestra-refusal type="{refusal_type}" reason="{reason}">{message}</archestra-refusal>"#
            ),
        };
        Self {
            audit: AuditRefusal {
                refusal_type: refusal_type.to_string(),
                tool,
                reason,
                tagged_body,
            },
            user: UserRefusal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_invocation_tag_carries_name_and_reason() {
        let pair = RefusalPair::tool_invocation("send_email", "policy-123", "blocked by policy");
        assert!(pair.audit.tagged_body.contains(r#"type="tool_invocation""#));
        assert!(pair.audit.tagged_body.contains(r#"tool="send_email""#));
        assert!(pair.audit.tagged_body.contains(r#"reason="policy-123""#));
        assert_eq!(pair.user.message, "blocked by policy");
    }

    #[test]
    fn token_cost_tag_omits_tool_attribute() {
        let pair = RefusalPair::token_cost("limit exceeded", "quota exceeded");
        assert!(pair.audit.tagged_body.contains(r#"type="token_cost""#));
        assert!(!pair.audit.tagged_body.contains("tool="));
    }
}
