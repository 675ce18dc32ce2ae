// Tool-Invocation Policy Evaluator.
//
// After the primary model proposes tool calls, decide per call whether
// it's permitted given the current context-trust level and the agent's
// tool-invocation policies. The first refusing rule short-circuits.

use std::sync::Arc;

use gateway_contracts::{Tool, ToolCall, ToolInvocationAction};
use uuid::Uuid;

use crate::error::Result;
use crate::refusal::RefusalPair;
use crate::repository::Repository;

/// Evaluate every proposed call in order; return the first refusal, or
/// `None` if every call is permitted.
pub async fn evaluate(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    proposed: &[ToolCall],
    context_is_trusted: bool,
) -> Result<Option<RefusalPair>> {
    for call in proposed {
        if let Some(refusal) = evaluate_call(repo, agent_id, call, context_is_trusted).await? {
            return Ok(Some(refusal));
        }
    }
    Ok(None)
}

async fn evaluate_call(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    call: &ToolCall,
    context_is_trusted: bool,
) -> Result<Option<RefusalPair>> {
    let tool = repo.get_tool(agent_id, &call.name).await?;

    let policies = repo.tool_invocation_policies(agent_id, &call.name).await?;
    for policy in &policies {
        let applies = condition_applies(policy.condition.as_deref(), call);
        if !applies {
            continue;
        }
        match policy.action {
            ToolInvocationAction::BlockAlways => {
                return Ok(Some(RefusalPair::tool_invocation(
                    &call.name,
                    policy.id,
                    format!("Tool '{}' is blocked by policy: {}", call.name, policy.description),
                )));
            }
            ToolInvocationAction::RequireTrustedContext if !context_is_trusted => {
                return Ok(Some(RefusalPair::tool_invocation(
                    &call.name,
                    policy.id,
                    format!(
                        "Tool '{}' requires a trusted context, but untrusted data is present: {}",
                        call.name, policy.description
                    ),
                )));
            }
            ToolInvocationAction::RequireTrustedContext => {}
        }
    }

    if let Some(tool) = tool_requires_trust_block(&tool, context_is_trusted) {
        return Ok(Some(RefusalPair::tool_invocation(
            &call.name,
            "allow_usage_when_untrusted_data_is_present=false",
            format!(
                "Tool '{}' does not allow use while untrusted data is present",
                tool.name
            ),
        )));
    }

    Ok(None)
}

/// §4.4: `allowUsageWhenUntrustedDataIsPresent=false` and
/// `contextIsTrusted=false` refuses independent of any policy.
fn tool_requires_trust_block(tool: &Option<Tool>, context_is_trusted: bool) -> Option<&Tool> {
    tool.as_ref().filter(|t| !t.allow_usage_when_untrusted_data_is_present && !context_is_trusted)
}

/// A policy with no condition always applies. A condition is a free-form
/// expression evaluated against the call's arguments; this module
/// supports the common case of a single `field=value` equality check and
/// treats anything else as "always applies" rather than rejecting
/// unparseable conditions outright (fail toward evaluating the policy).
fn condition_applies(condition: Option<&str>, call: &ToolCall) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let Some((field, expected)) = condition.split_once('=') else {
        return true;
    };
    call.arguments
        .get(field.trim())
        .and_then(|v| v.as_str())
        .map(|actual| actual == expected.trim())
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrusted_context_blocks_tool_without_usage_allowance() {
        let tool = Some(Tool {
            id: Uuid::nil(),
            agent_id: Uuid::nil(),
            name: "send_email".to_string(),
            description: "send an email".to_string(),
            parameters: serde_json::json!({}),
            allow_usage_when_untrusted_data_is_present: false,
            data_is_trusted_by_default: false,
        });
        assert!(tool_requires_trust_block(&tool, false).is_some());
        assert!(tool_requires_trust_block(&tool, true).is_none());
    }

    #[test]
    fn condition_with_no_expression_always_applies() {
        let call = ToolCall {
            id: "1".to_string(),
            name: "search".to_string(),
            arguments: serde_json::json!({}),
        };
        assert!(condition_applies(None, &call));
    }

    #[test]
    fn equality_condition_matches_argument() {
        let call = ToolCall {
            id: "1".to_string(),
            name: "search".to_string(),
            arguments: serde_json::json!({"scope": "external"}),
        };
        assert!(condition_applies(Some("scope=external"), &call));
        assert!(!condition_applies(Some("scope=internal"), &call));
    }
}
