// Trusted-Data Policy Engine.
//
// Classifies each `tool` message flowing back from a tool call as
// trusted, untrusted, or blocked against the agent's trusted-data
// policies, persists the classification, and filters blocked messages
// out of conversations before they go upstream.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_contracts::{ChatMessage, CreateInteraction, MessageRole, TrustAction, TrustClassification};
use uuid::Uuid;

use crate::attribute;
use crate::error::Result;
use crate::repository::Repository;

/// Per-request index from `tool_call_id` to tool name, built once from
/// an assistant message's proposed tool calls. Avoids repeated repository
/// round trips within a single request.
#[derive(Debug, Clone, Default)]
pub struct ToolCallIndex(HashMap<String, String>);

impl ToolCallIndex {
    /// Build the index by scanning assistant messages in a conversation
    /// for proposed `tool_calls`, newest first so a re-used id resolves
    /// to its most recent proposal.
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        let mut map = HashMap::new();
        for message in messages.iter().rev() {
            if message.role != MessageRole::Assistant {
                continue;
            }
            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    map.entry(call.id.clone()).or_insert_with(|| call.name.clone());
                }
            }
        }
        Self(map)
    }

    pub fn tool_name(&self, tool_call_id: &str) -> Option<&str> {
        self.0.get(tool_call_id).map(String::as_str)
    }

    fn merge(&mut self, other: ToolCallIndex) {
        for (k, v) in other.0 {
            self.0.entry(k).or_insert(v);
        }
    }
}

/// Classify every `tool` message in `messages` and persist the result.
/// Non-tool messages are ignored. A tool message with no resolvable
/// prior tool call is ignored with a logged warning (malformed
/// conversation). Returns the classification keyed by `tool_call_id` so
/// the orchestrator can feed untrusted blobs straight into the Dual-LLM
/// Context Evaluator without a second repository pass.
pub async fn evaluate_policies(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    chat_id: Uuid,
    messages: &[ChatMessage],
) -> Result<HashMap<String, TrustClassification>> {
    let mut index = ToolCallIndex::from_messages(messages);
    index.merge(reconstruct_index_from_history(repo, chat_id).await?);
    let mut classifications = HashMap::new();

    for message in messages {
        if !message.is_tool_result() {
            continue;
        }
        let Some(tool_call_id) = &message.tool_call_id else {
            tracing::warn!(%chat_id, "tool message missing tool_call_id, ignoring");
            continue;
        };
        let Some(tool_name) = index.tool_name(tool_call_id) else {
            tracing::warn!(%chat_id, tool_call_id, "no prior assistant tool_call found, ignoring malformed message");
            continue;
        };

        let Some(tool) = repo.get_tool(agent_id, tool_name).await? else {
            tracing::warn!(%chat_id, tool_name, "tool not registered for agent, ignoring");
            continue;
        };

        let content = message.content.clone().unwrap_or_default();
        let document: serde_json::Value =
            serde_json::from_str(&content).unwrap_or_else(|_| serde_json::Value::String(content));

        let policies = repo
            .trusted_data_policies_for_agent_and_tool(agent_id, tool.id)
            .await?;
        let (block_policies, trust_policies): (Vec<_>, Vec<_>) = policies
            .into_iter()
            .partition(|p| p.action == TrustAction::BlockAlways);

        let (classification, reason) = classify(&document, &block_policies, &trust_policies);
        classifications.insert(tool_call_id.clone(), classification);

        repo.create_interaction(CreateInteraction {
            agent_id,
            chat_id: Some(chat_id),
            r#type: "trust_classification".to_string(),
            content: Some(serde_json::to_value(message).unwrap_or_default()),
            trusted: classification.trusted,
            blocked: classification.blocked,
            reason: Some(reason),
            ..Default::default()
        })
        .await?;
    }

    Ok(classifications)
}

fn classify(
    document: &serde_json::Value,
    block_policies: &[gateway_contracts::TrustedDataPolicy],
    trust_policies: &[gateway_contracts::TrustedDataPolicy],
) -> (TrustClassification, String) {
    for policy in block_policies {
        let result = attribute::evaluate(document, &policy.attribute_path, policy.operator, &policy.value);
        if result.matched {
            return (TrustClassification::BLOCKED, policy.description.clone());
        }
    }
    for policy in trust_policies {
        let result = attribute::evaluate(document, &policy.attribute_path, policy.operator, &policy.value);
        if result.matched {
            return (TrustClassification::TRUSTED, policy.description.clone());
        }
    }
    (
        TrustClassification::DEFAULT,
        "content does not match any trust policies".to_string(),
    )
}

/// Reconstruct a `tool_call_id` -> tool name index by scanning persisted
/// interactions of `chat_id` and their assistant messages' tool calls.
async fn reconstruct_index_from_history(
    repo: &Arc<dyn Repository>,
    chat_id: Uuid,
) -> Result<ToolCallIndex> {
    let interactions = repo.interactions_for_chat(chat_id).await?;
    let mut map = HashMap::new();
    for interaction in interactions {
        let Some(content) = &interaction.content else {
            continue;
        };
        let Ok(message) = serde_json::from_value::<ChatMessage>(content.clone()) else {
            continue;
        };
        if message.role != MessageRole::Assistant {
            continue;
        }
        if let Some(calls) = message.tool_calls {
            for call in calls {
                map.entry(call.id).or_insert(call.name);
            }
        }
    }
    Ok(ToolCallIndex(map))
}

/// Drop every `tool` message whose prior persisted interaction was
/// classified `blocked=true`; everything else passes through unchanged
/// and in order.
pub async fn filter_out_blocked_data(
    repo: &Arc<dyn Repository>,
    chat_id: Uuid,
    messages: Vec<ChatMessage>,
) -> Result<Vec<ChatMessage>> {
    let interactions = repo.interactions_for_chat(chat_id).await?;
    let blocked_tool_call_ids: std::collections::HashSet<String> = interactions
        .iter()
        .filter(|i| i.blocked)
        .filter_map(|i| i.content.as_ref())
        .filter_map(|c| serde_json::from_value::<ChatMessage>(c.clone()).ok())
        .filter_map(|m| m.tool_call_id)
        .collect();

    Ok(messages
        .into_iter()
        .filter(|m| {
            if !m.is_tool_result() {
                return true;
            }
            match &m.tool_call_id {
                Some(id) => !blocked_tool_call_ids.contains(id),
                None => true,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_contracts::{Operator, TrustedDataPolicy};
    use serde_json::json;

    fn policy(action: TrustAction, path: &str, op: Operator, value: serde_json::Value) -> TrustedDataPolicy {
        TrustedDataPolicy {
            id: Uuid::nil(),
            tool_id: Uuid::nil(),
            attribute_path: path.to_string(),
            operator: op,
            value,
            action,
            description: "test policy".to_string(),
        }
    }

    #[test]
    fn block_always_takes_priority_over_trust() {
        let doc = json!({"emails": [{"from": "hacker@evil.com"}]});
        let block = vec![policy(
            TrustAction::BlockAlways,
            "emails[*].from",
            Operator::Contains,
            json!("hacker"),
        )];
        let trust = vec![policy(
            TrustAction::MarkAsTrusted,
            "emails[*].from",
            Operator::EndsWith,
            json!(".com"),
        )];
        let (classification, _) = classify(&doc, &block, &trust);
        assert!(classification.blocked);
        assert!(!classification.trusted);
    }

    #[test]
    fn no_policy_match_yields_default_classification() {
        let doc = json!({"emails": [{"from": "u@untrusted.com"}]});
        let (classification, reason) = classify(&doc, &[], &[]);
        assert!(!classification.trusted);
        assert!(!classification.blocked);
        assert!(reason.contains("does not match any trust policies"));
    }

    #[test]
    fn tool_call_index_resolves_most_recent_proposal() {
        let messages = vec![
            ChatMessage::assistant_with_tool_calls(vec![gateway_contracts::ToolCall {
                id: "call_1".to_string(),
                name: "search".to_string(),
                arguments: json!({}),
            }]),
            ChatMessage::tool_result("call_1", "{}"),
        ];
        let index = ToolCallIndex::from_messages(&messages);
        assert_eq!(index.tool_name("call_1"), Some("search"));
    }
}
