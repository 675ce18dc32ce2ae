// Anthropic-compatible proxy route: `/v1/anthropic/v1/messages`
// and `/v1/anthropic/v1/:agent_id/messages`. Translates the inbound
// Messages API request into the provider-agnostic engine, then renders
// `EngineOutcome`/`EngineEvent` back into Anthropic's response and SSE
// shapes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use gateway_anthropic::AnthropicDriver;
use gateway_core::llm::LlmDriver;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::proxy::engine::{self, EngineEvent, ProxyRequest, RunContext};
use crate::proxy::wire::{anthropic_to_common, AnthropicInboundRequest, AnthropicOutboundBlock, AnthropicOutboundResponse, AnthropicOutboundUsage};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/anthropic/v1/messages", post(handle_messages))
        .route("/v1/anthropic/v1/:agent_id/messages", post(handle_agent_messages))
        .with_state(state)
}

async fn handle_messages(state: State<AppState>, headers: HeaderMap, body: Json<AnthropicInboundRequest>) -> Response {
    run(state, None, headers, body).await
}

async fn handle_agent_messages(
    state: State<AppState>,
    Path(agent_id): Path<Uuid>,
    headers: HeaderMap,
    body: Json<AnthropicInboundRequest>,
) -> Response {
    run(state, Some(agent_id), headers, body).await
}

async fn run(
    State(state): State<AppState>,
    path_agent_id: Option<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AnthropicInboundRequest>,
) -> Response {
    match dispatch(state, path_agent_id, &headers, body).await {
        Ok(response) => response,
        Err(err) => anthropic_error(err.0),
    }
}

async fn dispatch(
    state: AppState,
    path_agent_id: Option<Uuid>,
    headers: &HeaderMap,
    body: AnthropicInboundRequest,
) -> Result<Response, ApiError> {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| gateway_core::GatewayError::Unauthorized("missing x-api-key header".to_string()))?;

    let user_agent_hint = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anthropic-unknown")
        .to_string();

    let agent = engine::resolve_agent(&state.repo, path_agent_id, &user_agent_hint).await?;
    let (messages, requested_tools) = anthropic_to_common(&body);
    let chat_id = engine::fallback_chat_id(&messages, agent.id);

    let request_json = json!({
        "model": body.model,
        "max_tokens": body.max_tokens,
        "stream": body.stream,
        "message_count": body.messages.len(),
        "tool_count": body.tools.len(),
    });

    let (org_id, refusal) = engine::check_quota(&state.repo, &agent).await?;
    if let Some(refusal) = refusal {
        engine::persist_refusal(&state.repo, agent.id, chat_id, "anthropic", request_json, &refusal).await;
        return Ok(anthropic_refusal(&body.model, refusal.user.message));
    }

    let tools = engine::prepare_tools(&state.repo, agent.id, requested_tools).await?;

    let request = ProxyRequest {
        path_agent_id,
        user_agent_hint,
        chat_id,
        messages: messages.clone(),
        requested_tools: Vec::new(),
        model: body.model.clone(),
        max_tokens: body.max_tokens,
        temperature: body.temperature,
        system: body.system.clone(),
    };
    let config = engine::build_config(&request, tools);

    let driver: Arc<dyn LlmDriver> = Arc::new(AnthropicDriver::with_base_url(api_key, state.config.anthropic_base_url.clone()));
    let ctx = RunContext {
        repo: state.repo.clone(),
        mcp: state.mcp.clone(),
        primary: driver.clone(),
        secondary: driver,
        secondary_model: state.config.secondary_model.clone(),
        usage_permits: state.usage_permits.clone(),
        agent_id: agent.id,
        org_id,
        chat_id,
        interaction_type: "anthropic:messages",
    };

    if body.stream {
        Ok(stream_response(ctx, messages, config, request_json, body.model))
    } else {
        let outcome = engine::run_non_streaming(&ctx, messages, config, request_json).await?;
        Ok(Json(render_response(&outcome.text, &outcome.tool_calls, &body.model, &outcome.metadata)).into_response())
    }
}

fn render_response(
    text: &str,
    tool_calls: &[gateway_contracts::ToolCall],
    model: &str,
    metadata: &gateway_core::llm::LlmCompletionMetadata,
) -> AnthropicOutboundResponse {
    let mut content = Vec::new();
    if !text.is_empty() {
        content.push(AnthropicOutboundBlock::Text { text: text.to_string() });
    }
    for call in tool_calls {
        content.push(AnthropicOutboundBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        });
    }
    let stop_reason = if !tool_calls.is_empty() { "tool_use" } else { "end_turn" };

    AnthropicOutboundResponse {
        id: format!("msg_{}", Uuid::now_v7()),
        r#type: "message",
        role: "assistant",
        model: model.to_string(),
        content,
        stop_reason,
        usage: AnthropicOutboundUsage {
            input_tokens: metadata.prompt_tokens.unwrap_or(0),
            output_tokens: metadata.completion_tokens.unwrap_or(0),
        },
    }
}

/// Render the engine's event stream into Anthropic's named-event SSE
/// framing (`message_start`, `content_block_start/delta/stop`,
/// `message_delta`, `message_stop`).
fn stream_response(
    ctx: RunContext,
    messages: Vec<gateway_contracts::ChatMessage>,
    config: gateway_core::llm::LlmCallConfig,
    request_json: serde_json::Value,
    model: String,
) -> Response {
    let message_id = format!("msg_{}", Uuid::now_v7());
    let engine_stream = engine::run_streaming(ctx, messages, config, request_json);

    let sse = async_stream::stream! {
        let start = json!({
            "type": "message_start",
            "message": {"id": message_id, "type": "message", "role": "assistant", "model": model, "content": [], "usage": {"input_tokens": 0, "output_tokens": 0}},
        });
        yield Ok::<_, Infallible>(sse_event("message_start", &start));
        yield Ok(sse_event(
            "content_block_start",
            &json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ));

        let mut engine_stream = std::pin::pin!(engine_stream);
        let mut stop_reason = "end_turn";

        while let Some(event) = engine_stream.next().await {
            match event {
                EngineEvent::DualLlmStarted => {
                    yield Ok(sse_event("dual_llm_started", &json!({"type": "dual_llm_started"})));
                }
                EngineEvent::DualLlmProgress(progress) => {
                    yield Ok(sse_event(
                        "dual_llm_progress",
                        &json!({
                            "type": "dual_llm_progress",
                            "question": progress.question,
                            "options": progress.options,
                            "answer": progress.answer,
                        }),
                    ));
                }
                EngineEvent::TextDelta(delta) => {
                    yield Ok(sse_event(
                        "content_block_delta",
                        &json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": delta}}),
                    ));
                }
                EngineEvent::ToolCalls(calls) => {
                    stop_reason = "tool_use";
                    yield Ok(sse_event(
                        "content_block_delta",
                        &json!({"type": "content_block_delta", "index": 0, "delta": {"type": "tool_calls", "calls": calls}}),
                    ));
                }
                EngineEvent::Refusal(message) => {
                    yield Ok(sse_event(
                        "content_block_delta",
                        &json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": message}}),
                    ));
                }
                EngineEvent::Done(metadata) => {
                    yield Ok(sse_event("content_block_stop", &json!({"type": "content_block_stop", "index": 0})));
                    yield Ok(sse_event(
                        "message_delta",
                        &json!({
                            "type": "message_delta",
                            "delta": {"stop_reason": stop_reason},
                            "usage": {"input_tokens": metadata.prompt_tokens.unwrap_or(0), "output_tokens": metadata.completion_tokens.unwrap_or(0)},
                        }),
                    ));
                    yield Ok(sse_event("message_stop", &json!({"type": "message_stop"})));
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn sse_event(event: &str, data: &serde_json::Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

fn anthropic_refusal(model: &str, message: String) -> Response {
    Json(AnthropicOutboundResponse {
        id: format!("msg_{}", Uuid::now_v7()),
        r#type: "message",
        role: "assistant",
        model: model.to_string(),
        content: vec![AnthropicOutboundBlock::Text { text: message }],
        stop_reason: "end_turn",
        usage: AnthropicOutboundUsage { input_tokens: 0, output_tokens: 0 },
    })
    .into_response()
}

fn anthropic_error(err: gateway_core::GatewayError) -> Response {
    ApiError(err).into_response()
}
