// Shared request/response shapes between the two provider modules:
// the pieces of the Anthropic Messages and OpenAI Chat Completions wire
// formats the orchestrator needs, kept separate from `gateway-anthropic`
// /`gateway-openai` (those describe the *upstream* wire; these describe
// the *inbound* client-facing one, which the spec requires to mirror
// it exactly).

use gateway_contracts::{ChatMessage, MessageRole, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicBlock>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: AnthropicToolResultContent },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnthropicToolResultContent {
    Text(String),
    Blocks(Vec<AnthropicBlock>),
}

impl AnthropicToolResultContent {
    fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    AnthropicBlock::Text { text } => Some(text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicInboundMessage {
    pub role: String,
    pub content: AnthropicContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicInboundTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicInboundRequest {
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub system: Option<String>,
    pub messages: Vec<AnthropicInboundMessage>,
    #[serde(default)]
    pub tools: Vec<AnthropicInboundTool>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_max_tokens() -> u32 {
    4096
}

/// Convert the inbound Anthropic request body into the orchestrator's
/// provider-agnostic `ChatMessage` list and tool declarations.
pub fn anthropic_to_common(request: &AnthropicInboundRequest) -> (Vec<ChatMessage>, Vec<ToolDefinition>) {
    let mut messages = Vec::new();

    for message in &request.messages {
        let role = match message.role.as_str() {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        };

        match &message.content {
            AnthropicContent::Text(text) => {
                messages.push(ChatMessage {
                    role,
                    content: Some(text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                });
            }
            AnthropicContent::Blocks(blocks) => {
                let mut text = String::new();
                let mut tool_calls = Vec::new();
                for block in blocks {
                    match block {
                        AnthropicBlock::Text { text: t } => text.push_str(t),
                        AnthropicBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: input.clone(),
                        }),
                        AnthropicBlock::ToolResult { tool_use_id, content } => {
                            messages.push(ChatMessage::tool_result(tool_use_id.clone(), content.to_text()));
                        }
                    }
                }
                if !text.is_empty() || !tool_calls.is_empty() {
                    messages.push(ChatMessage {
                        role,
                        content: if text.is_empty() { None } else { Some(text) },
                        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                        tool_call_id: None,
                    });
                }
            }
        }
    }

    let tools = request
        .tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name.clone(),
            description: t.description.clone(),
            parameters: t.input_schema.clone(),
            managed: false,
        })
        .collect();

    (messages, tools)
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicOutboundResponse {
    pub id: String,
    pub r#type: &'static str,
    pub role: &'static str,
    pub model: String,
    pub content: Vec<AnthropicOutboundBlock>,
    pub stop_reason: &'static str,
    pub usage: AnthropicOutboundUsage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicOutboundBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicOutboundUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInboundMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiInboundToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInboundToolCall {
    pub id: String,
    pub function: OpenAiInboundFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInboundFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInboundTool {
    pub function: OpenAiInboundFunctionDef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInboundFunctionDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInboundRequest {
    pub model: String,
    pub messages: Vec<OpenAiInboundMessage>,
    #[serde(default)]
    pub tools: Vec<OpenAiInboundTool>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

pub fn openai_to_common(request: &OpenAiInboundRequest) -> (Vec<ChatMessage>, Vec<ToolDefinition>, Option<String>) {
    let mut messages = Vec::new();
    let mut system = None;

    for message in &request.messages {
        let text = message
            .content
            .as_ref()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        match message.role.as_str() {
            "system" => system = Some(text),
            "assistant" => {
                let tool_calls = message.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|c| ToolCall {
                            id: c.id.clone(),
                            name: c.function.name.clone(),
                            arguments: serde_json::from_str(&c.function.arguments).unwrap_or(Value::Null),
                        })
                        .collect()
                });
                messages.push(ChatMessage {
                    role: MessageRole::Assistant,
                    content: if text.is_empty() { None } else { Some(text) },
                    tool_calls,
                    tool_call_id: None,
                });
            }
            "tool" => {
                if let Some(id) = &message.tool_call_id {
                    messages.push(ChatMessage::tool_result(id.clone(), text));
                }
            }
            _ => messages.push(ChatMessage::user(text)),
        }
    }

    let tools = request
        .tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.function.name.clone(),
            description: t.function.description.clone(),
            parameters: t.function.parameters.clone(),
            managed: false,
        })
        .collect();

    (messages, tools, system)
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiOutboundResponse {
    pub id: String,
    pub object: &'static str,
    pub model: String,
    pub choices: Vec<OpenAiOutboundChoice>,
    pub usage: OpenAiOutboundUsage,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiOutboundChoice {
    pub index: u32,
    pub message: OpenAiOutboundMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiOutboundMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiOutboundToolCall>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiOutboundToolCall {
    pub id: String,
    pub r#type: &'static str,
    pub function: OpenAiOutboundFunctionCall,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiOutboundFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiOutboundUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
