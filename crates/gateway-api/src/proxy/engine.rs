// The proxy orchestrator: the ten-step lifecycle shared by
// every provider-compatible route. Provider wire formats never appear
// here — `proxy::anthropic`/`proxy::openai` convert requests into
// `ProxyRequest` and translate `EngineEvent`/`EngineOutcome` back into
// their own SSE and JSON shapes.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use gateway_contracts::{
    Agent, ChatMessage, CreateInteraction, MessageRole, Organization, ToolCall, ToolDefinition,
    UpsertToolRequest,
};
use gateway_core::dual_llm::{self, DualLlmProgress, NullProgressSink, PendingUntrusted, ProgressSink};
use gateway_core::llm::{LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmMessage, LlmStreamEvent};
use gateway_core::repository::Repository;
use gateway_core::{quota, tool_invocation, trust, GatewayError, RefusalPair, Result};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::mcp::McpToolClient;

/// Request shape already translated out of the provider wire format.
pub struct ProxyRequest {
    pub path_agent_id: Option<Uuid>,
    pub user_agent_hint: String,
    pub chat_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub requested_tools: Vec<ToolDefinition>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system: Option<String>,
}

/// Everything one orchestrator run needs beyond the request itself.
/// Cheap to clone (every field is an `Arc` or a small owned value), so a
/// streaming call site can move its own copy into an `async_stream`
/// generator while a non-streaming call site borrows it.
#[derive(Clone)]
pub struct RunContext {
    pub repo: Arc<dyn Repository>,
    pub mcp: Arc<dyn McpToolClient>,
    pub primary: Arc<dyn LlmDriver>,
    pub secondary: Arc<dyn LlmDriver>,
    pub secondary_model: String,
    pub usage_permits: Arc<Semaphore>,
    pub agent_id: Uuid,
    pub org_id: Uuid,
    pub chat_id: Uuid,
    /// e.g. `"anthropic:messages"`, used verbatim as the persisted
    /// Interaction's `type`.
    pub interaction_type: &'static str,
}

/// Provider-agnostic event stream emitted while driving a streaming
/// request; the provider module renders each into its own SSE shape.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    DualLlmStarted,
    DualLlmProgress(DualLlmProgress),
    TextDelta(String),
    ToolCalls(Vec<ToolCall>),
    Refusal(String),
    Done(LlmCompletionMetadata),
}

/// Result of a non-streaming run.
pub struct EngineOutcome {
    pub agent_id: Uuid,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub metadata: LlmCompletionMetadata,
    pub refused: bool,
}

/// A channel-backed `ProgressSink` so the dual-LLM pass can hand
/// progress tuples straight to a streaming caller.
pub struct ChannelProgressSink {
    sender: tokio::sync::mpsc::UnboundedSender<DualLlmProgress>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<DualLlmProgress>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, progress: DualLlmProgress) {
        let _ = self.sender.send(progress);
    }
}

/// Step 1: resolve the governing agent, by path id or by the
/// get-or-create-default-agent fallback keyed on the inbound
/// `User-Agent` header.
pub async fn resolve_agent(
    repo: &Arc<dyn Repository>,
    path_agent_id: Option<Uuid>,
    user_agent_hint: &str,
) -> Result<Agent> {
    match path_agent_id {
        Some(id) => repo
            .get_agent(id)
            .await?
            .ok_or_else(|| GatewayError::agent_not_found(id)),
        None => repo.get_or_create_default_agent(user_agent_hint).await,
    }
}

async fn resolve_organization(repo: &Arc<dyn Repository>, agent: &Agent) -> Result<Organization> {
    let teams = repo.teams_for_agent(agent.id).await?;
    match teams.first() {
        Some(team) => repo
            .get_organization(team.org_id)
            .await?
            .ok_or_else(|| GatewayError::repository(format!("team {} has no organization row", team.id))),
        None => repo.default_organization().await,
    }
}

/// Step 2: pre-flight quota check. Returns the refusal pair, if any, when
/// the request must be refused before any upstream call is made. The
/// caller persists it (type `<provider>:refusal`) before returning the
/// refusal response to the client.
pub async fn check_quota(repo: &Arc<dyn Repository>, agent: &Agent) -> Result<(Uuid, Option<RefusalPair>)> {
    let org = resolve_organization(repo, agent).await?;
    let refusal = quota::pre_check(repo, agent.id, org.id, org.limit_cleanup_interval.as_duration()).await?;
    Ok((org.id, refusal))
}

/// Persist the Interaction for a pre-flight refusal (quota or tool
/// invocation) that short-circuits before any upstream call is made,
/// mirroring what `finish_run` does for a completed run.
pub async fn persist_refusal(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    chat_id: Uuid,
    provider: &str,
    request_json: serde_json::Value,
    refusal: &RefusalPair,
) {
    persist_interaction(
        repo,
        agent_id,
        chat_id,
        &format!("{provider}:refusal"),
        request_json,
        serde_json::json!({"text": refusal.user.message}),
        0,
        0,
        false,
        true,
        Some(refusal.audit.reason.clone()),
    )
    .await;
}

/// Step 3: upsert every tool the request declared, then merge the
/// agent's full registered tool set over it (managed wins on name
/// collision). Registering a tool never changes its existing trust
/// defaults.
pub async fn prepare_tools(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    requested: Vec<ToolDefinition>,
) -> Result<Vec<ToolDefinition>> {
    for tool in &requested {
        repo.upsert_tool(UpsertToolRequest {
            agent_id,
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
            allow_usage_when_untrusted_data_is_present: false,
            data_is_trusted_by_default: false,
            mcp_endpoint: None,
        })
        .await?;
    }

    let registered: Vec<ToolDefinition> = repo
        .tools_for_agent(agent_id)
        .await?
        .into_iter()
        .map(|t| ToolDefinition {
            name: t.name,
            description: t.description,
            parameters: t.parameters,
            managed: true,
        })
        .collect();

    Ok(ToolDefinition::merge(requested, registered))
}

/// Step 4: classify every tool-result message, drop blocked ones, run
/// the untrusted survivors through the Dual-LLM Context Evaluator, and
/// apply its rewrites. Returns the sanitised message list plus whether
/// the overall context is trusted.
pub async fn evaluate_trust_and_context(
    repo: &Arc<dyn Repository>,
    secondary: &dyn LlmDriver,
    secondary_model: &str,
    agent_id: Uuid,
    chat_id: Uuid,
    messages: Vec<ChatMessage>,
    progress: &dyn ProgressSink,
) -> Result<(Vec<ChatMessage>, bool)> {
    let classifications = trust::evaluate_policies(repo, agent_id, chat_id, &messages).await?;
    let any_blocked = classifications.values().any(|c| c.blocked);
    let filtered = trust::filter_out_blocked_data(repo, chat_id, messages).await?;

    let index = trust::ToolCallIndex::from_messages(&filtered);
    let mut pending = Vec::new();
    for message in &filtered {
        if !message.is_tool_result() {
            continue;
        }
        let Some(id) = &message.tool_call_id else { continue };
        let Some(classification) = classifications.get(id) else { continue };
        let Some(tool_name) = index.tool_name(id) else { continue };

        let tool_trusted_by_default = repo
            .get_tool(agent_id, tool_name)
            .await?
            .map(|t| t.data_is_trusted_by_default)
            .unwrap_or(false);

        if dual_llm::classification_is_untrusted(*classification, tool_trusted_by_default) {
            pending.push(PendingUntrusted {
                tool_call_id: id.clone(),
                tool_name: tool_name.to_string(),
                content: message.content.clone().unwrap_or_default(),
            });
        }
    }

    let question = filtered
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .and_then(|m| m.content.clone())
        .unwrap_or_default();

    let outcome =
        dual_llm::evaluate_if_context_is_trusted(secondary, secondary_model, &question, pending, any_blocked, progress)
            .await;

    let rewritten = dual_llm::apply_rewrites(filtered, &outcome.tool_result_updates);
    Ok((rewritten, outcome.context_is_trusted))
}

pub fn to_llm_messages(messages: &[ChatMessage]) -> Vec<LlmMessage> {
    messages.iter().map(LlmMessage::from).collect()
}

/// Step 7: evaluate every proposed call; on refusal, build the
/// provider-visible refusal text and suppress the buffered tool calls.
pub async fn evaluate_tool_invocation(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    proposed: &[ToolCall],
    context_is_trusted: bool,
) -> Result<Option<String>> {
    let refusal = tool_invocation::evaluate(repo, agent_id, proposed, context_is_trusted).await?;
    Ok(refusal.map(|r| r.user.message))
}

/// Step 8: execute every permitted, managed tool call via MCP and feed
/// the results back to the primary model for a follow-up completion,
/// whose response becomes the final answer. Tools without a registered
/// `mcp_endpoint` are skipped — the caller surfaces their raw proposal
/// instead of a result.
pub async fn execute_managed_tools_and_follow_up(
    repo: &Arc<dyn Repository>,
    mcp: &dyn McpToolClient,
    primary: &dyn LlmDriver,
    agent_id: Uuid,
    mut messages: Vec<ChatMessage>,
    tool_calls: Vec<ToolCall>,
    config: LlmCallConfig,
) -> Result<(String, LlmCompletionMetadata)> {
    messages.push(ChatMessage::assistant_with_tool_calls(tool_calls.clone()));

    let mut executed_any = false;
    for call in &tool_calls {
        let Some(tool) = repo.get_tool(agent_id, &call.name).await? else {
            continue;
        };
        let Some(endpoint) = tool.mcp_endpoint.as_deref() else {
            continue;
        };
        executed_any = true;
        let result = match mcp.execute(endpoint, call).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "mcp tool execution failed");
                serde_json::json!({"error": err}).to_string()
            }
        };
        messages.push(ChatMessage::tool_result(call.id.clone(), result));
    }

    if !executed_any {
        return Ok((String::new(), LlmCompletionMetadata::default()));
    }

    let response = primary.chat_completion(to_llm_messages(&messages), config).await?;
    Ok((response.text, response.metadata))
}

/// Outcome of resolving whatever the primary model proposed: either a
/// plain answer, a refused answer, or an answer produced by executing
/// every managed tool call and folding the results back through the
/// primary model (steps 7-8 combined, shared by both provider modules
/// and both streaming/non-streaming call sites).
pub struct ToolResolution {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub metadata: LlmCompletionMetadata,
    pub refused: bool,
}

#[allow(clippy::too_many_arguments)]
pub async fn finalize_tool_calls(
    repo: &Arc<dyn Repository>,
    mcp: &dyn McpToolClient,
    primary: &dyn LlmDriver,
    agent_id: Uuid,
    messages: Vec<ChatMessage>,
    text: String,
    tool_calls: Vec<ToolCall>,
    metadata: LlmCompletionMetadata,
    context_is_trusted: bool,
    config: LlmCallConfig,
) -> Result<ToolResolution> {
    if tool_calls.is_empty() {
        return Ok(ToolResolution { text, tool_calls, metadata, refused: false });
    }

    if let Some(reason) = evaluate_tool_invocation(repo, agent_id, &tool_calls, context_is_trusted).await? {
        return Ok(ToolResolution {
            text: reason,
            tool_calls: Vec::new(),
            metadata,
            refused: true,
        });
    }

    let (follow_text, follow_metadata) =
        execute_managed_tools_and_follow_up(repo, mcp, primary, agent_id, messages, tool_calls.clone(), config).await?;

    if follow_text.is_empty() {
        // No proposed call had a registered `mcp_endpoint` — nothing
        // executed server-side, surface the raw proposal to the client.
        return Ok(ToolResolution { text, tool_calls, metadata, refused: false });
    }

    Ok(ToolResolution {
        text: follow_text,
        tool_calls: Vec::new(),
        metadata: follow_metadata,
        refused: false,
    })
}

/// Step 9: persist the completed Interaction. Errors are logged and
/// swallowed — the user has already seen a successful completion.
pub async fn persist_interaction(
    repo: &Arc<dyn Repository>,
    agent_id: Uuid,
    chat_id: Uuid,
    interaction_type: &str,
    request: serde_json::Value,
    response: serde_json::Value,
    input_tokens: i64,
    output_tokens: i64,
    trusted: bool,
    blocked: bool,
    reason: Option<String>,
) {
    let result = repo
        .create_interaction(CreateInteraction {
            agent_id,
            chat_id: Some(chat_id),
            r#type: interaction_type.to_string(),
            request: Some(request),
            response: Some(response),
            input_tokens,
            output_tokens,
            trusted,
            blocked,
            reason,
            ..Default::default()
        })
        .await;

    if let Err(err) = result {
        tracing::error!(%agent_id, %chat_id, error = %err, "audit_persist_failure: interaction not recorded");
    }
}

/// Fire the post-completion quota increment in the background, bounded
/// by `permits`.
pub fn spawn_usage_update(
    repo: Arc<dyn Repository>,
    permits: Arc<tokio::sync::Semaphore>,
    agent_id: Uuid,
    org_id: Uuid,
    tokens_in: i64,
    tokens_out: i64,
) {
    tokio::spawn(async move {
        let Ok(_permit) = permits.acquire().await else {
            return;
        };
        quota::apply_usage(&repo, agent_id, org_id, tokens_in, tokens_out).await;
    });
}

/// Mapping helper shared by both provider modules: turn the tool
/// definitions agreed on in step 3 into an `LlmCallConfig`.
pub fn build_config(request: &ProxyRequest, tools: Vec<ToolDefinition>) -> LlmCallConfig {
    LlmCallConfig {
        model: request.model.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        system: request.system.clone(),
        tools,
    }
}

/// Drive steps 4-9 for a non-streaming request: trust/dual-LLM
/// evaluation, the primary call, tool resolution, persistence, and the
/// background quota increment.
pub async fn run_non_streaming(
    ctx: &RunContext,
    messages: Vec<ChatMessage>,
    config: LlmCallConfig,
    request_json: serde_json::Value,
) -> Result<EngineOutcome> {
    let (sanitized, context_is_trusted) = evaluate_trust_and_context(
        &ctx.repo,
        ctx.secondary.as_ref(),
        &ctx.secondary_model,
        ctx.agent_id,
        ctx.chat_id,
        messages,
        &NullProgressSink,
    )
    .await?;

    let response = ctx.primary.chat_completion(to_llm_messages(&sanitized), config.clone()).await?;

    let resolution = finalize_tool_calls(
        &ctx.repo,
        ctx.mcp.as_ref(),
        ctx.primary.as_ref(),
        ctx.agent_id,
        sanitized,
        response.text,
        response.tool_calls.unwrap_or_default(),
        response.metadata,
        context_is_trusted,
        config,
    )
    .await?;

    finish_run(ctx, &resolution, context_is_trusted, request_json).await;

    Ok(EngineOutcome {
        agent_id: ctx.agent_id,
        text: resolution.text,
        tool_calls: resolution.tool_calls,
        metadata: resolution.metadata,
        refused: resolution.refused,
    })
}

/// Drive steps 4-9 for a streaming request, emitting `EngineEvent`s as
/// they become available. The primary model's text deltas are forwarded
/// as soon as they arrive; managed-tool execution (step 8), when it
/// happens, necessarily buffers its own (non-streamed) follow-up call
/// and is emitted as a single final `TextDelta` before `Done`.
pub fn run_streaming(ctx: RunContext, messages: Vec<ChatMessage>, config: LlmCallConfig, request_json: serde_json::Value) -> impl Stream<Item = EngineEvent> + Send {
    async_stream::stream! {
        yield EngineEvent::DualLlmStarted;

        let (progress_sink, mut progress_rx) = ChannelProgressSink::new();
        let trust_ctx = ctx.clone();
        let trust_messages = messages;
        let trust_task = tokio::spawn(async move {
            evaluate_trust_and_context(
                &trust_ctx.repo,
                trust_ctx.secondary.as_ref(),
                &trust_ctx.secondary_model,
                trust_ctx.agent_id,
                trust_ctx.chat_id,
                trust_messages,
                &progress_sink,
            )
            .await
        });

        while let Some(progress) = progress_rx.recv().await {
            yield EngineEvent::DualLlmProgress(progress);
        }

        let (sanitized, context_is_trusted) = match trust_task.await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                yield EngineEvent::Refusal(format!("internal error: {err}"));
                return;
            }
            Err(err) => {
                yield EngineEvent::Refusal(format!("internal error: {err}"));
                return;
            }
        };

        let mut stream = match ctx.primary.chat_completion_stream(to_llm_messages(&sanitized), config.clone()).await {
            Ok(stream) => stream,
            Err(err) => {
                yield EngineEvent::Refusal(format!("upstream error: {err}"));
                return;
            }
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut metadata = LlmCompletionMetadata::default();

        while let Some(event) = stream.next().await {
            match event {
                Ok(LlmStreamEvent::TextDelta(delta)) => {
                    if !delta.is_empty() {
                        text.push_str(&delta);
                        yield EngineEvent::TextDelta(delta);
                    }
                }
                Ok(LlmStreamEvent::ToolCalls(calls)) => tool_calls = calls,
                Ok(LlmStreamEvent::Done(meta)) => {
                    metadata = meta;
                    break;
                }
                Ok(LlmStreamEvent::Error(err)) => {
                    yield EngineEvent::Refusal(format!("upstream error: {err}"));
                    return;
                }
                Err(err) => {
                    yield EngineEvent::Refusal(format!("upstream error: {err}"));
                    return;
                }
            }
        }
        drop(stream);

        let resolution = match finalize_tool_calls(
            &ctx.repo,
            ctx.mcp.as_ref(),
            ctx.primary.as_ref(),
            ctx.agent_id,
            sanitized,
            text,
            tool_calls.clone(),
            metadata,
            context_is_trusted,
            config,
        )
        .await
        {
            Ok(resolution) => resolution,
            Err(err) => {
                yield EngineEvent::Refusal(format!("internal error: {err}"));
                return;
            }
        };

        if resolution.refused {
            yield EngineEvent::Refusal(resolution.text.clone());
        } else if !resolution.tool_calls.is_empty() {
            yield EngineEvent::ToolCalls(resolution.tool_calls.clone());
        } else if !tool_calls.is_empty() {
            // tool_calls were buffered but finalize_tool_calls folded them
            // into a follow-up answer; the extra text arrived only now.
            yield EngineEvent::TextDelta(resolution.text.clone());
        }

        finish_run(&ctx, &resolution, context_is_trusted, request_json).await;

        yield EngineEvent::Done(resolution.metadata.clone());
    }
}

async fn finish_run(ctx: &RunContext, resolution: &ToolResolution, context_is_trusted: bool, request_json: serde_json::Value) {
    let response_json = serde_json::json!({
        "text": resolution.text,
        "tool_calls": resolution.tool_calls,
    });

    persist_interaction(
        &ctx.repo,
        ctx.agent_id,
        ctx.chat_id,
        ctx.interaction_type,
        request_json,
        response_json,
        resolution.metadata.prompt_tokens.unwrap_or(0) as i64,
        resolution.metadata.completion_tokens.unwrap_or(0) as i64,
        context_is_trusted,
        resolution.refused,
        resolution.refused.then(|| resolution.text.clone()),
    )
    .await;

    spawn_usage_update(
        ctx.repo.clone(),
        ctx.usage_permits.clone(),
        ctx.agent_id,
        ctx.org_id,
        resolution.metadata.prompt_tokens.unwrap_or(0) as i64,
        resolution.metadata.completion_tokens.unwrap_or(0) as i64,
    );
}

/// Derive a stable `chat_id` for providers whose wire format carries no
/// session identifier: a UUIDv5 seeded by the agent id and the first
/// user message (see DESIGN.md for the tradeoff). Clients that resend
/// the growing conversation each turn, the normal pattern for these
/// APIs, land on the same `chat_id` as long as that first message
/// doesn't change.
pub fn fallback_chat_id(messages: &[ChatMessage], agent_id: Uuid) -> Uuid {
    let mut seed = format!("{agent_id}");
    for message in messages {
        if message.role == MessageRole::User {
            if let Some(content) = &message.content {
                seed.push('\u{1}');
                seed.push_str(content);
                break;
            }
        }
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
}
