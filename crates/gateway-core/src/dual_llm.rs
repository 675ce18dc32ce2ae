// Dual-LLM Context Evaluator.
//
// When a conversation contains tool messages classified untrusted (but
// not blocked), their bytes must never reach the primary model. This
// module isolates each untrusted blob in a secondary, sandboxed model
// call restricted to a finite, per-tool candidate-answer table, then
// rewrites the tool message to the chosen candidate string.

use std::collections::HashMap;

use gateway_contracts::{ChatMessage, TrustClassification};
use serde::{Deserialize, Serialize};

use crate::llm::{LlmCallConfig, LlmDriver, LlmMessage, LlmMessageRole};

/// One `(question, candidate options, chosen answer)` tuple, forwarded to
/// the orchestrator's progress channel so a streaming client sees the
/// dual-LLM reasoning trail in real time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DualLlmProgress {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DualLlmOutcome {
    pub tool_result_updates: HashMap<String, String>,
    pub context_is_trusted: bool,
}

/// A pending untrusted tool-result blob awaiting a secondary-model pass.
#[derive(Debug, Clone)]
pub struct PendingUntrusted {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: String,
}

/// Deterministic, per-tool-name candidate-answer table. Keys are tool
/// names; falls back to a generic yes/no/unknown set for tools without
/// a dedicated template.
pub fn candidate_table(tool_name: &str) -> Vec<String> {
    match tool_name {
        "read_email" | "search_email" | "list_emails" => vec![
            "urgent".to_string(),
            "not urgent".to_string(),
            "no relevant content".to_string(),
        ],
        "web_search" | "fetch_url" => vec![
            "relevant result found".to_string(),
            "no relevant result".to_string(),
        ],
        _ => vec![
            "yes".to_string(),
            "no".to_string(),
            "no relevant content".to_string(),
        ],
    }
}

/// Progress sink the orchestrator supplies; streaming callers forward
/// each tuple as a provider-specific event, non-streaming callers may
/// discard it or collect it for audit.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: DualLlmProgress);
}

/// A no-op sink for non-streaming or test callers.
pub struct NullProgressSink;
impl ProgressSink for NullProgressSink {
    fn emit(&self, _progress: DualLlmProgress) {}
}

/// Run the dual-LLM pass over `messages`. `question` is the user's most
/// recent question (step 1); `untrusted` is every pending untrusted
/// tool-result blob paired with its source tool name. Trusted-by-default
/// tools with no policy match (classified `(false, false)`) are excluded
/// from `untrusted` by the caller per the §9 "consult tool default" rule.
pub async fn evaluate_if_context_is_trusted(
    secondary_driver: &dyn LlmDriver,
    secondary_model: &str,
    question: &str,
    untrusted: Vec<PendingUntrusted>,
    any_blocked: bool,
    progress: &dyn ProgressSink,
) -> DualLlmOutcome {
    if untrusted.is_empty() {
        return DualLlmOutcome {
            tool_result_updates: HashMap::new(),
            context_is_trusted: !any_blocked,
        };
    }

    let mut updates = HashMap::new();
    for item in untrusted {
        let options = candidate_table(&item.tool_name);
        let answer = resolve_candidate(secondary_driver, secondary_model, question, &item.content, &options).await;
        progress.emit(DualLlmProgress {
            question: question.to_string(),
            options: options.clone(),
            answer: answer.clone(),
        });
        updates.insert(item.tool_call_id, answer);
    }

    DualLlmOutcome {
        tool_result_updates: updates,
        context_is_trusted: false,
    }
}

/// Call the secondary, isolated model instance restricted to reply with
/// a single candidate index. Fail-closed: any driver error or malformed
/// (non-numeric, out-of-range) response yields an empty string, treated
/// as no match and rewritten to an empty string.
async fn resolve_candidate(
    driver: &dyn LlmDriver,
    model: &str,
    question: &str,
    isolated_content: &str,
    options: &[String],
) -> String {
    let enumerated = options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{i}: {o}"))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Question: {question}\n\nIsolated content:\n{isolated_content}\n\n\
         Candidate answers:\n{enumerated}\n\nReply with only the numeric index of the best answer."
    );

    let config = LlmCallConfig {
        model: model.to_string(),
        max_tokens: 8,
        temperature: Some(0.0),
        system: None,
        tools: Vec::new(),
    };

    let messages = vec![LlmMessage::text(LlmMessageRole::User, prompt)];

    let response = match driver.chat_completion(messages, config).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "dual-llm secondary model call failed, failing closed");
            return String::new();
        }
    };

    let index: Option<usize> = response.text.trim().parse().ok();
    match index.and_then(|i| options.get(i)) {
        Some(answer) => answer.clone(),
        None => {
            tracing::warn!(raw = %response.text, "dual-llm secondary response malformed, treating as no match");
            String::new()
        }
    }
}

/// Apply `tool_result_updates` to `messages`, replacing each matching
/// tool message's content with the sanitised candidate string (spec
/// §4.3 step 5). Messages with no update are passed through unchanged.
pub fn apply_rewrites(messages: Vec<ChatMessage>, updates: &HashMap<String, String>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .map(|mut message| {
            if let Some(id) = &message.tool_call_id {
                if let Some(replacement) = updates.get(id) {
                    message.content = Some(replacement.clone());
                }
            }
            message
        })
        .collect()
}

/// A conversation is trusted iff it has no untrusted-or-blocked tool
/// messages at evaluation time. The `(false, false)` classification from
/// a tool with `data_is_trusted_by_default = true` and no matching
/// policy is *not* untrusted — callers consult the tool's own default
/// rather than treating an unclassified result as suspect.
pub fn classification_is_untrusted(classification: TrustClassification, tool_trusted_by_default: bool) -> bool {
    if classification.blocked {
        return false; // blocked is handled separately, never "untrusted"
    }
    if classification.trusted {
        return false;
    }
    // (false, false): untrusted unless the tool defaults to trusted.
    !tool_trusted_by_default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trusted_tool_with_no_policy_match_is_not_untrusted() {
        assert!(!classification_is_untrusted(TrustClassification::DEFAULT, true));
    }

    #[test]
    fn default_classification_without_tool_default_is_untrusted() {
        assert!(classification_is_untrusted(TrustClassification::DEFAULT, false));
    }

    #[test]
    fn explicitly_trusted_is_never_untrusted() {
        assert!(!classification_is_untrusted(TrustClassification::TRUSTED, false));
    }

    #[test]
    fn candidate_table_is_finite_and_deterministic() {
        let a = candidate_table("read_email");
        let b = candidate_table("read_email");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[tokio::test]
    async fn empty_untrusted_set_with_no_blocked_is_trusted() {
        let outcome = evaluate_if_context_is_trusted(
            &NullDriver,
            "secondary-model",
            "is this urgent?",
            vec![],
            false,
            &NullProgressSink,
        )
        .await;
        assert!(outcome.context_is_trusted);
        assert!(outcome.tool_result_updates.is_empty());
    }

    struct NullDriver;

    #[async_trait::async_trait]
    impl LlmDriver for NullDriver {
        async fn chat_completion(
            &self,
            _messages: Vec<LlmMessage>,
            _config: LlmCallConfig,
        ) -> crate::error::Result<crate::llm::LlmResponse> {
            unreachable!("not exercised by this test")
        }

        async fn chat_completion_stream(
            &self,
            _messages: Vec<LlmMessage>,
            _config: LlmCallConfig,
        ) -> crate::error::Result<crate::llm::LlmResponseStream> {
            unreachable!("not exercised by this test")
        }
    }
}
