//! GenAI-based completion provider implementation
//!
//! Uses the genai framework with manual tool control: tool calls come back to
//! the conversation loop for dispatch instead of being executed in-library.

use async_trait::async_trait;
use futures::StreamExt;
use genai::Client;
use genai::WebConfig;
use genai::chat::{
    ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, Tool, ToolCall, ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionResult, LlmProvider, PendingToolCall, ToolDefinition};
use crate::error::{Error, Result};
use crate::transcript::{Turn, TurnContent};

/// Supported completion provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Anthropic (Claude)
    Anthropic,
    /// OpenAI (GPT-4o, etc.)
    OpenAI,
    /// Google Gemini
    Gemini,
    /// Groq (fast inference)
    Groq,
    /// DeepSeek
    DeepSeek,
    /// Ollama (local)
    Ollama,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderType::Anthropic),
            "openai" => Ok(ProviderType::OpenAI),
            "gemini" | "google" => Ok(ProviderType::Gemini),
            "groq" => Ok(ProviderType::Groq),
            "deepseek" => Ok(ProviderType::DeepSeek),
            "ollama" => Ok(ProviderType::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl ProviderType {
    /// Get the default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "claude-sonnet-4-20250514",
            ProviderType::OpenAI => "gpt-4o",
            ProviderType::Gemini => "gemini-1.5-pro",
            ProviderType::Groq => "llama-3.3-70b-versatile",
            ProviderType::DeepSeek => "deepseek-chat",
            ProviderType::Ollama => "llama3.2",
        }
    }

    /// Get the environment variable name for the API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Gemini => Some("GEMINI_API_KEY"),
            ProviderType::Groq => Some("GROQ_API_KEY"),
            ProviderType::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderType::Ollama => None,
        }
    }

    /// Get the provider type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAI => "openai",
            ProviderType::Gemini => "gemini",
            ProviderType::Groq => "groq",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::Ollama => "ollama",
        }
    }
}

/// A completion provider backed by genai
pub struct GenAIProvider {
    client: Client,
    provider_type: ProviderType,
    model: String,
    system_prompt: Option<String>,
    max_tokens: Option<u32>,
}

impl GenAIProvider {
    /// Default timeout for completion requests (5 minutes)
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    fn default_web_config() -> WebConfig {
        WebConfig::default()
            .with_timeout(Self::DEFAULT_TIMEOUT)
            .with_connect_timeout(Duration::from_secs(30))
    }

    /// Create a new provider with default settings (uses environment variables for auth)
    pub fn new(provider_type: ProviderType, model: Option<&str>) -> Self {
        let client = Client::builder()
            .with_web_config(Self::default_web_config())
            .build();
        Self {
            client,
            provider_type,
            model: model.unwrap_or(provider_type.default_model()).to_string(),
            system_prompt: None,
            max_tokens: None,
        }
    }

    /// Create a provider with a specific API key
    pub fn with_api_key(provider_type: ProviderType, api_key: &str, model: Option<&str>) -> Self {
        let api_key = api_key.to_string();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden| -> std::result::Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );

        let client = Client::builder()
            .with_web_config(Self::default_web_config())
            .with_auth_resolver(auth_resolver)
            .build();

        Self {
            client,
            provider_type,
            model: model.unwrap_or(provider_type.default_model()).to_string(),
            system_prompt: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Cap the tokens generated per completion
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Get the provider type
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert the transcript into a genai chat request
    fn build_request(&self, turns: &[Turn], tools: &[ToolDefinition]) -> ChatRequest {
        let mut chat_req = ChatRequest::default();

        if let Some(system) = &self.system_prompt {
            chat_req = chat_req.with_system(system.as_str());
        }

        for turn in turns {
            match &turn.content {
                TurnContent::User { text } => {
                    chat_req = chat_req.append_message(ChatMessage::user(text.as_str()));
                }
                TurnContent::Assistant { text, tool_calls } => {
                    if tool_calls.is_empty() {
                        let content = text.clone().unwrap_or_default();
                        chat_req = chat_req.append_message(ChatMessage::assistant(content));
                    } else {
                        // OpenAI-style APIs require the batch of tool calls in
                        // a single assistant message
                        let genai_tool_calls: Vec<ToolCall> = tool_calls
                            .iter()
                            .map(|tc| ToolCall {
                                call_id: tc.call_id.clone(),
                                fn_name: tc.name.clone(),
                                fn_arguments: tc.arguments.clone(),
                                thought_signatures: None,
                            })
                            .collect();
                        chat_req = chat_req.append_message(genai_tool_calls);
                    }
                }
                TurnContent::ToolResult {
                    call_id, content, ..
                } => {
                    chat_req = chat_req
                        .append_message(ToolResponse::new(call_id.clone(), content.clone()));
                }
            }
        }

        if !tools.is_empty() {
            let genai_tools: Vec<Tool> = tools
                .iter()
                .map(|t| {
                    Tool::new(&t.name)
                        .with_description(&t.description)
                        .with_schema(t.parameters.clone())
                })
                .collect();
            chat_req = chat_req.with_tools(genai_tools);
        }

        chat_req
    }
}

#[async_trait]
impl LlmProvider for GenAIProvider {
    fn name(&self) -> &str {
        self.provider_type.as_str()
    }

    async fn chat(&self, turns: &[Turn], tools: &[ToolDefinition]) -> Result<CompletionResult> {
        let chat_req = self.build_request(turns, tools);
        let options = self
            .max_tokens
            .map(|m| ChatOptions::default().with_max_tokens(m));

        // Streaming keeps long completions from tripping request timeouts
        let stream_response = self
            .client
            .exec_chat_stream(&self.model, chat_req, options.as_ref())
            .await
            .map_err(|e| Error::Provider(format!("Completion request failed: {}", e)))?;

        let mut content = String::new();
        let mut tool_calls: Vec<PendingToolCall> = Vec::new();

        let mut stream = stream_response.stream;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => {
                    content.push_str(&chunk.content);
                }
                Ok(ChatStreamEvent::ReasoningChunk(chunk)) => {
                    content.push_str(&chunk.content);
                }
                Ok(ChatStreamEvent::ToolCallChunk(tc)) => {
                    let tool_call = tc.tool_call;
                    tool_calls.push(PendingToolCall {
                        call_id: tool_call.call_id,
                        name: tool_call.fn_name,
                        arguments: tool_call.fn_arguments,
                    });
                }
                Ok(ChatStreamEvent::End(_)) => {
                    break;
                }
                Ok(ChatStreamEvent::Start) | Ok(ChatStreamEvent::ThoughtSignatureChunk(_)) => {}
                Err(e) => {
                    tracing::error!(error = ?e, model = %self.model, "completion stream error");
                    return Err(Error::Provider(format!("Completion stream error: {:?}", e)));
                }
            }
        }

        tracing::debug!(
            model = %self.model,
            content_len = content.len(),
            tool_call_count = tool_calls.len(),
            "completion finished"
        );

        Ok(CompletionResult {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls,
        })
    }
}
