// LLM Driver Abstractions
//
// Provider-agnostic interface to upstream completion APIs: a streaming
// trait, message/config types, and a provider-type enum. Concrete
// drivers (`gateway-anthropic`, `gateway-openai`) implement `LlmDriver`;
// this crate never references them directly to avoid a circular
// dependency — the orchestrator in `gateway-api` picks the driver.

use async_trait::async_trait;
use futures::Stream;
use gateway_contracts::{ToolCall, ToolDefinition};
use std::pin::Pin;

/// Type alias for the LLM response stream
pub type LlmResponseStream = Pin<Box<dyn Stream<Item = crate::error::Result<LlmStreamEvent>> + Send>>;

/// Events emitted during LLM streaming
#[derive(Debug, Clone)]
pub enum LlmStreamEvent {
    TextDelta(String),
    ToolCalls(Vec<ToolCall>),
    Done(LlmCompletionMetadata),
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct LlmCompletionMetadata {
    pub total_tokens: Option<u32>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
}

/// Trait for LLM drivers. Implementations handle provider-specific API
/// calls and response parsing.
#[async_trait]
pub trait LlmDriver: Send + Sync {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: LlmCallConfig,
    ) -> crate::error::Result<LlmResponseStream>;

    /// Convenience wrapper draining the stream into a single response.
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: LlmCallConfig,
    ) -> crate::error::Result<LlmResponse> {
        use futures::StreamExt;

        let mut stream = self.chat_completion_stream(messages, config).await?;
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut metadata = LlmCompletionMetadata::default();

        while let Some(event) = stream.next().await {
            match event? {
                LlmStreamEvent::TextDelta(delta) => text.push_str(&delta),
                LlmStreamEvent::ToolCalls(calls) => tool_calls = calls,
                LlmStreamEvent::Done(meta) => metadata = meta,
                LlmStreamEvent::Error(err) => return Err(crate::error::GatewayError::upstream(502, err)),
            }
        }

        Ok(LlmResponse {
            text,
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            metadata,
        })
    }
}

#[async_trait]
impl LlmDriver for Box<dyn LlmDriver> {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: LlmCallConfig,
    ) -> crate::error::Result<LlmResponseStream> {
        (**self).chat_completion_stream(messages, config).await
    }

    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: LlmCallConfig,
    ) -> crate::error::Result<LlmResponse> {
        (**self).chat_completion(messages, config).await
    }
}

/// Message format for LLM calls (provider-agnostic)
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: LlmMessageRole,
    pub content: LlmMessageContent,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_call_id: Option<String>,
}

impl LlmMessage {
    pub fn text(role: LlmMessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: LlmMessageContent::Text(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

impl From<&gateway_contracts::ChatMessage> for LlmMessage {
    fn from(msg: &gateway_contracts::ChatMessage) -> Self {
        use gateway_contracts::MessageRole;
        let role = match msg.role {
            MessageRole::System => LlmMessageRole::System,
            MessageRole::User => LlmMessageRole::User,
            MessageRole::Assistant => LlmMessageRole::Assistant,
            MessageRole::Tool => LlmMessageRole::Tool,
        };
        Self {
            role,
            content: LlmMessageContent::Text(msg.content.clone().unwrap_or_default()),
            tool_calls: msg.tool_calls.clone(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LlmMessageContent {
    Text(String),
    Parts(Vec<LlmContentPart>),
}

impl LlmMessageContent {
    pub fn to_text(&self) -> String {
        match self {
            LlmMessageContent::Text(s) => s.clone(),
            LlmMessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    LlmContentPart::Text { text } => Some(text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LlmContentPart {
    Text { text: String },
    Image { url: String },
    Audio { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Configuration for an LLM call
#[derive(Debug, Clone)]
pub struct LlmCallConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub tools: Vec<ToolDefinition>,
}

/// Response from an LLM call (non-streaming)
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub metadata: LlmCompletionMetadata,
}

/// Builder for `LlmCallConfig` with a fluent API.
pub struct LlmCallConfigBuilder {
    config: LlmCallConfig,
}

impl LlmCallConfigBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            config: LlmCallConfig {
                model: model.into(),
                temperature: None,
                max_tokens: 4096,
                system: None,
                tools: Vec::new(),
            },
        }
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.config.system = Some(system.into());
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn build(self) -> LlmCallConfig {
        self.config
    }
}

/// Provider type enumeration matching the agent/tool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Anthropic,
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            _ => Err(format!("unknown provider type: {s}")),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Anthropic => write!(f, "anthropic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_new() {
        let config = LlmCallConfigBuilder::new("claude-opus").build();
        assert_eq!(config.model, "claude-opus");
        assert!(config.temperature.is_none());
        assert!(config.tools.is_empty());
    }

    #[test]
    fn builder_with_all_options() {
        let config = LlmCallConfigBuilder::new("gpt-4o")
            .temperature(0.7)
            .max_tokens(1000)
            .system("be concise")
            .build();
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.system.as_deref(), Some("be concise"));
    }

    #[test]
    fn provider_type_parsing_round_trips() {
        assert_eq!("openai".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!("anthropic".parse::<ProviderType>().unwrap(), ProviderType::Anthropic);
        assert!("ollama".parse::<ProviderType>().is_err());
        assert_eq!(ProviderType::OpenAI.to_string(), "openai");
    }
}
