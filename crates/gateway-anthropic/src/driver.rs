// Anthropic Messages API driver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use gateway_contracts::ToolCall;
use gateway_core::error::{GatewayError, Result};
use gateway_core::llm::{
    LlmCallConfig, LlmCompletionMetadata, LlmContentPart, LlmDriver, LlmMessage,
    LlmMessageContent, LlmMessageRole, LlmResponseStream, LlmStreamEvent,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicDriver {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicDriver {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Anthropic keeps the system prompt out of `messages`; tool-role
    /// messages become a user message with a `tool_result` block.
    fn convert_message(msg: &LlmMessage) -> AnthropicMessage {
        match msg.role {
            LlmMessageRole::Tool => AnthropicMessage {
                role: "user".to_string(),
                content: vec![AnthropicContentBlock::ToolResult {
                    tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                    content: msg.content.to_text(),
                }],
            },
            LlmMessageRole::Assistant if msg.tool_calls.is_some() => {
                let mut blocks = Vec::new();
                let text = msg.content.to_text();
                if !text.is_empty() {
                    blocks.push(AnthropicContentBlock::Text { text });
                }
                for call in msg.tool_calls.as_ref().unwrap() {
                    blocks.push(AnthropicContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    });
                }
                AnthropicMessage {
                    role: "assistant".to_string(),
                    content: blocks,
                }
            }
            LlmMessageRole::System => AnthropicMessage {
                // Callers should route system content through `config.system`;
                // an inline System message still round-trips as a user turn.
                role: "user".to_string(),
                content: vec![AnthropicContentBlock::Text { text: msg.content.to_text() }],
            },
            _ => AnthropicMessage {
                role: match msg.role {
                    LlmMessageRole::User => "user",
                    _ => "assistant",
                }
                .to_string(),
                content: Self::convert_content(&msg.content),
            },
        }
    }

    fn convert_content(content: &LlmMessageContent) -> Vec<AnthropicContentBlock> {
        match content {
            LlmMessageContent::Text(text) => vec![AnthropicContentBlock::Text { text: text.clone() }],
            LlmMessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    LlmContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                    LlmContentPart::Image { url } => AnthropicContentBlock::Image { source: url.clone() },
                    LlmContentPart::Audio { url } => AnthropicContentBlock::Text {
                        text: format!("[audio: {url}]"),
                    },
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LlmDriver for AnthropicDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        let anthropic_messages: Vec<AnthropicMessage> =
            messages.iter().map(Self::convert_message).collect();

        let tools = if config.tools.is_empty() {
            None
        } else {
            Some(
                config
                    .tools
                    .iter()
                    .map(|tool| AnthropicTool {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        input_schema: tool.parameters.clone(),
                    })
                    .collect(),
            )
        };

        let request = AnthropicRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system: config.system.clone(),
            temperature: config.temperature,
            messages: anthropic_messages,
            stream: true,
            tools,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(502, format!("anthropic request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(status, body));
        }

        let model = config.model.clone();
        let input_tokens = Arc::new(Mutex::new(0u32));
        let output_tokens = Arc::new(Mutex::new(0u32));
        let blocks = Arc::new(Mutex::new(HashMap::<u32, PendingBlock>::new()));
        let event_stream = response.bytes_stream().eventsource();

        let converted: LlmResponseStream = Box::pin(event_stream.filter_map(move |result| {
            let model = model.clone();
            let input_tokens = Arc::clone(&input_tokens);
            let output_tokens = Arc::clone(&output_tokens);
            let blocks = Arc::clone(&blocks);

            async move {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => return Some(Ok(LlmStreamEvent::Error(format!("stream error: {e}")))),
                };

                match event.event.as_str() {
                    "message_start" => {
                        if let Ok(parsed) = serde_json::from_str::<MessageStartEvent>(&event.data) {
                            *input_tokens.lock().unwrap() = parsed.message.usage.input_tokens;
                        }
                        None
                    }
                    "content_block_start" => {
                        if let Ok(parsed) = serde_json::from_str::<ContentBlockStartEvent>(&event.data) {
                            if let ContentBlock::ToolUse { id, name } = parsed.content_block {
                                blocks.lock().unwrap().insert(
                                    parsed.index,
                                    PendingBlock { id, name, json: String::new() },
                                );
                            }
                        }
                        None
                    }
                    "content_block_delta" => {
                        let parsed: ContentBlockDeltaEvent = match serde_json::from_str(&event.data) {
                            Ok(v) => v,
                            Err(e) => return Some(Ok(LlmStreamEvent::Error(format!("malformed delta: {e}")))),
                        };
                        match parsed.delta {
                            Delta::TextDelta { text } => Some(Ok(LlmStreamEvent::TextDelta(text))),
                            Delta::InputJsonDelta { partial_json } => {
                                if let Some(block) = blocks.lock().unwrap().get_mut(&parsed.index) {
                                    block.json.push_str(&partial_json);
                                }
                                None
                            }
                        }
                    }
                    "message_delta" => {
                        if let Ok(parsed) = serde_json::from_str::<MessageDeltaEvent>(&event.data) {
                            *output_tokens.lock().unwrap() = parsed.usage.output_tokens;
                            if let Some(stop_reason) = parsed.delta.stop_reason {
                                if stop_reason == "tool_use" {
                                    let calls: Vec<ToolCall> = blocks
                                        .lock()
                                        .unwrap()
                                        .drain()
                                        .map(|(_, block)| ToolCall {
                                            id: block.id,
                                            name: block.name,
                                            arguments: serde_json::from_str(&block.json).unwrap_or(json!({})),
                                        })
                                        .collect();
                                    if !calls.is_empty() {
                                        return Some(Ok(LlmStreamEvent::ToolCalls(calls)));
                                    }
                                }
                                let metadata = LlmCompletionMetadata {
                                    total_tokens: Some(
                                        *input_tokens.lock().unwrap() + *output_tokens.lock().unwrap(),
                                    ),
                                    prompt_tokens: Some(*input_tokens.lock().unwrap()),
                                    completion_tokens: Some(*output_tokens.lock().unwrap()),
                                    model: Some(model),
                                    finish_reason: Some(stop_reason),
                                };
                                return Some(Ok(LlmStreamEvent::Done(metadata)));
                            }
                        }
                        None
                    }
                    _ => None,
                }
            }
        }));

        Ok(converted)
    }
}

impl std::fmt::Debug for AnthropicDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicDriver")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

struct PendingBlock {
    id: String,
    name: String,
    json: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<AnthropicMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(rename = "tool_use_id")]
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct MessageStartEvent {
    message: MessageStartInner,
}

#[derive(Debug, Deserialize)]
struct MessageStartInner {
    usage: Usage,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStartEvent {
    index: u32,
    content_block: ContentBlock,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { #[serde(default)] text: String },
    ToolUse { id: String, name: String },
}

#[derive(Debug, Deserialize)]
struct ContentBlockDeltaEvent {
    index: u32,
    delta: Delta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDeltaInner,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaInner {
    #[serde(default)]
    stop_reason: Option<String>,
}
