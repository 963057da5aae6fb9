//! The conversation loop
//!
//! Drives the exchange between the user, the completion endpoint, and the
//! tool servers: append the user turn, request a completion, execute any tool
//! calls the model asked for, feed the results back, and repeat until the
//! model answers with text alone.

use std::sync::Arc;

use scholar_mcp::McpPrompt;

use crate::command::{ChatInput, parse_input};
use crate::error::Result;
use crate::provider::LlmProvider;
use crate::sessions::SessionManager;
use crate::transcript::{ToolCallRequest, Transcript};

/// Progress events emitted while processing one input.
///
/// The CLI renders these; tests collect them.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Text produced by the assistant
    AssistantText(String),
    /// A tool call is about to be dispatched
    ToolCallStarted {
        call_id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// A tool call resolved (successfully or not)
    ToolCallFinished {
        call_id: String,
        name: String,
        success: bool,
        output: String,
    },
    /// Content of a fetched resource
    ResourceContent { uri: String, text: String },
    /// The cached prompt declarations
    PromptList(Vec<McpPrompt>),
    /// A rendered prompt was injected as the next user turn
    PromptInjected { name: String },
    /// Usage errors and other user-facing notices
    Notice(String),
}

/// Whether the chat loop should keep running after an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

/// The conversation loop state: transcript, completion provider, sessions
pub struct ChatLoop {
    provider: Arc<dyn LlmProvider>,
    sessions: SessionManager,
    transcript: Transcript,
}

impl ChatLoop {
    pub fn new(provider: Arc<dyn LlmProvider>, sessions: SessionManager) -> Self {
        Self {
            provider,
            sessions,
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Close all tool server connections
    pub async fn shutdown(&mut self) {
        self.sessions.shutdown().await;
    }

    /// Process one line of user input.
    ///
    /// Capability lookups that fail (unknown resource, unknown prompt) are
    /// reported through the sink and the loop continues; a completion
    /// endpoint failure is returned to the caller with the transcript intact.
    pub async fn handle_input(
        &mut self,
        input: &str,
        sink: &mut dyn FnMut(ChatEvent),
    ) -> Result<LoopControl> {
        let Some(parsed) = parse_input(input) else {
            return Ok(LoopControl::Continue);
        };

        match parsed {
            ChatInput::Quit => return Ok(LoopControl::Quit),
            ChatInput::Resource { uri } => match self.sessions.read_resource(&uri).await {
                Ok(text) => sink(ChatEvent::ResourceContent { uri, text }),
                Err(e) => sink(ChatEvent::Notice(e.to_string())),
            },
            ChatInput::ListPrompts => {
                sink(ChatEvent::PromptList(self.sessions.prompts().to_vec()));
            }
            ChatInput::RenderPrompt { name, args } => {
                match self.sessions.render_prompt(&name, args).await {
                    Ok(text) => {
                        sink(ChatEvent::PromptInjected { name });
                        self.process_query(text, sink).await?;
                    }
                    Err(e) => sink(ChatEvent::Notice(e.to_string())),
                }
            }
            ChatInput::Query { text } => {
                self.process_query(text, sink).await?;
            }
            ChatInput::Usage { message } => sink(ChatEvent::Notice(message)),
        }

        Ok(LoopControl::Continue)
    }

    /// Run completion rounds for one user turn until the model produces a
    /// text-only reply.
    async fn process_query(
        &mut self,
        text: String,
        sink: &mut dyn FnMut(ChatEvent),
    ) -> Result<()> {
        self.transcript.push_user(text);

        loop {
            let tools = self.sessions.tool_definitions();

            // A transport failure here aborts the round; everything already
            // appended stays so the next input continues the conversation.
            let result = self.provider.chat(self.transcript.turns(), &tools).await?;

            if let Some(content) = &result.content
                && !content.is_empty()
            {
                sink(ChatEvent::AssistantText(content.clone()));
            }

            let calls: Vec<ToolCallRequest> = result
                .tool_calls
                .iter()
                .map(|tc| ToolCallRequest {
                    call_id: tc.call_id.clone(),
                    name: tc.name.clone(),
                    arguments: tc.arguments.clone(),
                })
                .collect();

            self.transcript.push_assistant(result.content, calls.clone());

            if calls.is_empty() {
                return Ok(());
            }

            for call in &calls {
                sink(ChatEvent::ToolCallStarted {
                    call_id: call.call_id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                // Dispatch failures become failed tool results the model can
                // see and react to; they never abort the round.
                let (output, is_error) = match self.sessions.dispatch(call).await {
                    Ok(result) => (result.text(), result.is_error),
                    Err(e) => (e.to_string(), true),
                };

                sink(ChatEvent::ToolCallFinished {
                    call_id: call.call_id.clone(),
                    name: call.name.clone(),
                    success: !is_error,
                    output: output.clone(),
                });

                self.transcript
                    .push_tool_result(&call.call_id, output, is_error);
            }
        }
    }
}
