//! LLM Provider abstraction using GenAI
//!
//! This module provides the completion endpoint interface: the conversation
//! loop hands over the transcript plus the aggregated tool declarations and
//! gets back either text or a batch of tool invocation requests.

mod genai_provider;

pub use genai_provider::{GenAIProvider, ProviderType};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::transcript::Turn;

/// Tool declaration as advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Response from a completion: text content, tool calls, or both
#[derive(Debug, Clone, Default)]
pub struct CompletionResult {
    /// Text content from the assistant (may be present even with tool calls)
    pub content: Option<String>,
    /// Tool calls the loop must execute before the next completion
    pub tool_calls: Vec<PendingToolCall>,
}

impl CompletionResult {
    /// Check if this result has any tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Check if this result has text content
    pub fn has_content(&self) -> bool {
        self.content.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }
}

/// Trait for completion providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "anthropic", "openai")
    fn name(&self) -> &str;

    /// Send the transcript and tool declarations, receive the next turn
    async fn chat(&self, turns: &[Turn], tools: &[ToolDefinition]) -> Result<CompletionResult>;
}
