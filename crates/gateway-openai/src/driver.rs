// OpenAI-compatible chat/completions driver.

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

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiDriver {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiDriver {
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

    fn role_str(role: &LlmMessageRole) -> &'static str {
        match role {
            LlmMessageRole::System => "system",
            LlmMessageRole::User => "user",
            LlmMessageRole::Assistant => "assistant",
            LlmMessageRole::Tool => "tool",
        }
    }

    fn convert_message(msg: &LlmMessage) -> OpenAiMessage {
        let content = match &msg.content {
            LlmMessageContent::Text(text) => Some(OpenAiContent::Text(text.clone())),
            LlmMessageContent::Parts(parts) => Some(OpenAiContent::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        LlmContentPart::Text { text } => OpenAiContentPart::Text {
                            r#type: "text".to_string(),
                            text: text.clone(),
                        },
                        LlmContentPart::Image { url } => OpenAiContentPart::ImageUrl {
                            r#type: "image_url".to_string(),
                            image_url: OpenAiImageUrl { url: url.clone() },
                        },
                        LlmContentPart::Audio { url } => OpenAiContentPart::InputAudio {
                            r#type: "input_audio".to_string(),
                            input_audio: OpenAiInputAudio {
                                data: url.clone(),
                                format: "wav".to_string(),
                            },
                        },
                    })
                    .collect(),
            )),
        };

        OpenAiMessage {
            role: Self::role_str(&msg.role).to_string(),
            content,
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| OpenAiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAiFunctionCall {
                            name: tc.name.clone(),
                            arguments: serde_json::to_string(&tc.arguments).unwrap_or_default(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[async_trait]
impl LlmDriver for OpenAiDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        let mut openai_messages: Vec<OpenAiMessage> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &config.system {
            openai_messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(OpenAiContent::Text(system.clone())),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        openai_messages.extend(messages.iter().map(Self::convert_message));

        let tools = if config.tools.is_empty() {
            None
        } else {
            Some(
                config
                    .tools
                    .iter()
                    .map(|tool| OpenAiTool {
                        r#type: "function".to_string(),
                        function: OpenAiFunction {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters: tool.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let request = OpenAiRequest {
            model: config.model.clone(),
            messages: openai_messages,
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            stream: true,
            stream_options: OpenAiStreamOptions { include_usage: true },
            tools,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(502, format!("openai request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(status, body));
        }

        let model = config.model.clone();
        let accumulated_tool_calls = Arc::new(Mutex::new(Vec::<ToolCall>::new()));
        let finish_reason = Arc::new(Mutex::new(None::<String>));
        let prompt_tokens = Arc::new(Mutex::new(None::<u32>));
        let completion_tokens = Arc::new(Mutex::new(None::<u32>));
        let event_stream = response.bytes_stream().eventsource();

        let converted: LlmResponseStream = Box::pin(event_stream.then(move |result| {
            let model = model.clone();
            let accumulated_tool_calls = Arc::clone(&accumulated_tool_calls);
            let finish_reason = Arc::clone(&finish_reason);
            let prompt_tokens = Arc::clone(&prompt_tokens);
            let completion_tokens = Arc::clone(&completion_tokens);

            async move {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => return Ok(LlmStreamEvent::Error(format!("stream error: {e}"))),
                };

                if event.data == "[DONE]" {
                    return Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                        total_tokens: match (*prompt_tokens.lock().unwrap(), *completion_tokens.lock().unwrap()) {
                            (Some(p), Some(c)) => Some(p + c),
                            _ => None,
                        },
                        prompt_tokens: *prompt_tokens.lock().unwrap(),
                        completion_tokens: *completion_tokens.lock().unwrap(),
                        model: Some(model),
                        finish_reason: finish_reason.lock().unwrap().clone(),
                    }));
                }

                let chunk: OpenAiStreamChunk = match serde_json::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => return Ok(LlmStreamEvent::Error(format!("malformed chunk: {e}"))),
                };

                // The `stream_options.include_usage` final chunk carries
                // real usage with an empty `choices` array and no other
                // content to forward.
                if let Some(usage) = &chunk.usage {
                    *prompt_tokens.lock().unwrap() = Some(usage.prompt_tokens);
                    *completion_tokens.lock().unwrap() = Some(usage.completion_tokens);
                }

                let Some(choice) = chunk.choices.first() else {
                    return Ok(LlmStreamEvent::TextDelta(String::new()));
                };

                if let Some(deltas) = &choice.delta.tool_calls {
                    let mut acc = accumulated_tool_calls.lock().unwrap();
                    for delta in deltas {
                        let idx = delta.index as usize;
                        while acc.len() <= idx {
                            acc.push(ToolCall {
                                id: String::new(),
                                name: String::new(),
                                arguments: json!(""),
                            });
                        }
                        if let Some(id) = &delta.id {
                            acc[idx].id = id.clone();
                        }
                        if let Some(function) = &delta.function {
                            if let Some(name) = &function.name {
                                acc[idx].name = name.clone();
                            }
                            if let Some(args) = &function.arguments {
                                let current = acc[idx].arguments.as_str().unwrap_or("").to_string();
                                acc[idx].arguments = json!(format!("{current}{args}"));
                            }
                        }
                    }
                    return Ok(LlmStreamEvent::TextDelta(String::new()));
                }

                if let Some(content) = &choice.delta.content {
                    return Ok(LlmStreamEvent::TextDelta(content.clone()));
                }

                if let Some(reason) = &choice.finish_reason {
                    *finish_reason.lock().unwrap() = Some(reason.clone());

                    if reason == "tool_calls" {
                        let calls = accumulated_tool_calls.lock().unwrap().clone();
                        if !calls.is_empty() {
                            let parsed = calls
                                .into_iter()
                                .map(|mut tc| {
                                    if let Some(raw) = tc.arguments.as_str() {
                                        tc.arguments = serde_json::from_str(raw).unwrap_or(json!({}));
                                    }
                                    tc
                                })
                                .collect();
                            return Ok(LlmStreamEvent::ToolCalls(parsed));
                        }
                    }
                }

                Ok(LlmStreamEvent::TextDelta(String::new()))
            }
        }));

        Ok(converted)
    }
}

impl std::fmt::Debug for OpenAiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiDriver")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    stream_options: OpenAiStreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

/// Requests the final usage-only chunk the streaming loop reads real
/// token counts from, instead of counting deltas.
#[derive(Debug, Serialize)]
struct OpenAiStreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OpenAiContentPart {
    Text { r#type: String, text: String },
    ImageUrl { r#type: String, image_url: OpenAiImageUrl },
    InputAudio { r#type: String, input_audio: OpenAiInputAudio },
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiInputAudio {
    data: String,
    format: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<OpenAiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiStreamUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: u32,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
