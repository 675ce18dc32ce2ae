// OpenAI-compatible proxy route: `/v1/openai/v1/chat/completions`
// and `/v1/openai/v1/:agent_id/chat/completions`. Mirrors
// `proxy::anthropic`, translating the inbound Chat Completions request
// into the provider-agnostic engine and rendering `EngineOutcome`/
// `EngineEvent` back into OpenAI's response and SSE shapes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use gateway_openai::OpenAiDriver;
use gateway_core::llm::LlmDriver;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::proxy::engine::{self, EngineEvent, ProxyRequest, RunContext};
use crate::proxy::wire::{openai_to_common, OpenAiInboundRequest, OpenAiOutboundChoice, OpenAiOutboundMessage, OpenAiOutboundResponse, OpenAiOutboundToolCall, OpenAiOutboundFunctionCall, OpenAiOutboundUsage};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/openai/v1/chat/completions", post(handle_completions))
        .route("/v1/openai/v1/:agent_id/chat/completions", post(handle_agent_completions))
        .with_state(state)
}

async fn handle_completions(state: State<AppState>, headers: HeaderMap, body: Json<OpenAiInboundRequest>) -> Response {
    run(state, None, headers, body).await
}

async fn handle_agent_completions(
    state: State<AppState>,
    Path(agent_id): Path<Uuid>,
    headers: HeaderMap,
    body: Json<OpenAiInboundRequest>,
) -> Response {
    run(state, Some(agent_id), headers, body).await
}

async fn run(
    State(state): State<AppState>,
    path_agent_id: Option<Uuid>,
    headers: HeaderMap,
    Json(body): Json<OpenAiInboundRequest>,
) -> Response {
    match dispatch(state, path_agent_id, &headers, body).await {
        Ok(response) => response,
        Err(err) => ApiError(err.0).into_response(),
    }
}

async fn dispatch(
    state: AppState,
    path_agent_id: Option<Uuid>,
    headers: &HeaderMap,
    body: OpenAiInboundRequest,
) -> Result<Response, ApiError> {
    let api_key = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or_else(|| gateway_core::GatewayError::Unauthorized("missing Authorization: Bearer header".to_string()))?;

    let user_agent_hint = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("openai-unknown")
        .to_string();

    let agent = engine::resolve_agent(&state.repo, path_agent_id, &user_agent_hint).await?;
    let (messages, requested_tools, system) = openai_to_common(&body);
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
        engine::persist_refusal(&state.repo, agent.id, chat_id, "openai", request_json, &refusal).await;
        return Ok(openai_refusal(&body.model, refusal.user.message));
    }

    let tools = engine::prepare_tools(&state.repo, agent.id, requested_tools).await?;

    let request = ProxyRequest {
        path_agent_id,
        user_agent_hint,
        chat_id,
        messages: messages.clone(),
        requested_tools: Vec::new(),
        model: body.model.clone(),
        max_tokens: body.max_tokens.unwrap_or(4096),
        temperature: body.temperature,
        system,
    };
    let config = engine::build_config(&request, tools);

    let driver: Arc<dyn LlmDriver> = Arc::new(OpenAiDriver::with_base_url(api_key, state.config.openai_base_url.clone()));
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
        interaction_type: "openai:chat_completion",
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
) -> OpenAiOutboundResponse {
    let (content, finish_reason) = if tool_calls.is_empty() {
        (Some(text.to_string()), "stop")
    } else {
        (None, "tool_calls")
    };

    let tool_calls = if tool_calls.is_empty() {
        None
    } else {
        Some(
            tool_calls
                .iter()
                .map(|call| OpenAiOutboundToolCall {
                    id: call.id.clone(),
                    r#type: "function",
                    function: OpenAiOutboundFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    let prompt_tokens = metadata.prompt_tokens.unwrap_or(0);
    let completion_tokens = metadata.completion_tokens.unwrap_or(0);

    OpenAiOutboundResponse {
        id: format!("chatcmpl-{}", Uuid::now_v7()),
        object: "chat.completion",
        model: model.to_string(),
        choices: vec![OpenAiOutboundChoice {
            index: 0,
            message: OpenAiOutboundMessage { role: "assistant", content, tool_calls },
            finish_reason,
        }],
        usage: OpenAiOutboundUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    }
}

/// Render the engine's event stream into OpenAI's `chat.completion.chunk`
/// SSE framing, terminated by the `[DONE]` sentinel.
fn stream_response(
    ctx: RunContext,
    messages: Vec<gateway_contracts::ChatMessage>,
    config: gateway_core::llm::LlmCallConfig,
    request_json: serde_json::Value,
    model: String,
) -> Response {
    let id = format!("chatcmpl-{}", Uuid::now_v7());
    let engine_stream = engine::run_streaming(ctx, messages, config, request_json);

    let sse = async_stream::stream! {
        let mut engine_stream = std::pin::pin!(engine_stream);

        while let Some(event) = engine_stream.next().await {
            match event {
                EngineEvent::DualLlmStarted => {
                    yield Ok::<_, Infallible>(named_event("dual_llm_started", json!({})));
                }
                EngineEvent::DualLlmProgress(progress) => {
                    yield Ok(named_event(
                        "dual_llm_progress",
                        json!({"question": progress.question, "options": progress.options, "answer": progress.answer}),
                    ));
                }
                EngineEvent::TextDelta(delta) => {
                    yield Ok::<_, Infallible>(chunk(&id, &model, json!({"role": "assistant", "content": delta}), None));
                }
                EngineEvent::Refusal(message) => {
                    yield Ok(chunk(&id, &model, json!({"role": "assistant", "content": message}), Some("stop")));
                }
                EngineEvent::ToolCalls(calls) => {
                    yield Ok(chunk(&id, &model, json!({"role": "assistant", "tool_calls": calls}), Some("tool_calls")));
                }
                EngineEvent::Done(_) => {
                    yield Ok(chunk(&id, &model, json!({}), Some("stop")));
                    yield Ok("data: [DONE]\n\n".to_string());
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

/// Named SSE event carrying gateway-internal (non-OpenAI-wire) data, used
/// for the dual-LLM progress events OpenAI's own wire format has no slot
/// for.
fn named_event(name: &str, data: serde_json::Value) -> String {
    format!("event: {name}\ndata: {data}\n\n")
}

fn chunk(id: &str, model: &str, delta: serde_json::Value, finish_reason: Option<&str>) -> String {
    let payload = json!({
        "id": id,
        "object": "chat.completion.chunk",
        "model": model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}],
    });
    format!("data: {payload}\n\n")
}

fn openai_refusal(model: &str, message: String) -> Response {
    Json(render_response(&message, &[], model, &gateway_core::llm::LlmCompletionMetadata::default())).into_response()
}
