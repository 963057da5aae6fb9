//! Conversation transcript
//!
//! The transcript is the append-only record of one interactive session. Tool
//! results always directly follow the assistant turn that requested them, in
//! request order, keyed by call identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Model-assigned call identifier, unique per request
    pub call_id: String,
    /// Name of the tool
    pub name: String,
    /// Argument mapping
    pub arguments: Value,
}

/// Content of a single transcript turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnContent {
    User {
        text: String,
    },
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },
    ToolResult {
        call_id: String,
        content: String,
        is_error: bool,
    },
}

/// One entry in the conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique ID for this turn
    pub id: String,
    pub content: TurnContent,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::from_content(TurnContent::User { text: text.into() })
    }

    /// Create a new assistant turn, optionally carrying tool requests
    pub fn assistant(text: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::from_content(TurnContent::Assistant { text, tool_calls })
    }

    /// Create a tool result turn
    pub fn tool_result(
        call_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::from_content(TurnContent::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
            is_error,
        })
    }

    fn from_content(content: TurnContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            timestamp: Utc::now(),
        }
    }

    /// Role label for logging
    pub fn role(&self) -> &'static str {
        match self.content {
            TurnContent::User { .. } => "user",
            TurnContent::Assistant { .. } => "assistant",
            TurnContent::ToolResult { .. } => "tool",
        }
    }
}

/// An append-only, strictly ordered sequence of turns
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn
    pub fn push_user(&mut self, text: impl Into<String>) -> &Turn {
        self.turns.push(Turn::user(text));
        self.turns.last().unwrap()
    }

    /// Append an assistant turn
    pub fn push_assistant(
        &mut self,
        text: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> &Turn {
        self.turns.push(Turn::assistant(text, tool_calls));
        self.turns.last().unwrap()
    }

    /// Append a tool result turn
    pub fn push_tool_result(
        &mut self,
        call_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> &Turn {
        self.turns.push(Turn::tool_result(call_id, content, is_error));
        self.turns.last().unwrap()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Check the ordering invariant: every assistant turn with N tool requests
    /// is followed by exactly N tool result turns whose call ids match in
    /// request order, and no tool result appears anywhere else.
    pub fn is_well_formed(&self) -> bool {
        let mut expected: Vec<String> = Vec::new();

        for turn in &self.turns {
            match &turn.content {
                TurnContent::ToolResult { call_id, .. } => {
                    if expected.is_empty() || expected.remove(0) != *call_id {
                        return false;
                    }
                }
                _ if !expected.is_empty() => return false,
                TurnContent::Assistant { tool_calls, .. } => {
                    expected = tool_calls.iter().map(|c| c.call_id.clone()).collect();
                }
                TurnContent::User { .. } => {}
            }
        }

        expected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_are_appended_in_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("hello");
        transcript.push_assistant(Some("hi".to_string()), Vec::new());

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].role(), "user");
        assert_eq!(transcript.turns()[1].role(), "assistant");
        assert!(transcript.is_well_formed());
    }

    #[test]
    fn tool_results_must_follow_their_request() {
        let mut transcript = Transcript::new();
        transcript.push_user("find papers");
        transcript.push_assistant(
            None,
            vec![
                ToolCallRequest {
                    call_id: "call_1".to_string(),
                    name: "search_papers".to_string(),
                    arguments: serde_json::json!({ "topic": "llm agents" }),
                },
                ToolCallRequest {
                    call_id: "call_2".to_string(),
                    name: "extract_info".to_string(),
                    arguments: serde_json::json!({ "paper_id": "2301.00001" }),
                },
            ],
        );

        transcript.push_tool_result("call_1", "[\"2301.00001\"]", false);
        assert!(!transcript.is_well_formed()); // second result still pending

        transcript.push_tool_result("call_2", "{}", false);
        assert!(transcript.is_well_formed());
    }

    #[test]
    fn out_of_order_results_are_rejected() {
        let mut transcript = Transcript::new();
        transcript.push_assistant(
            None,
            vec![
                ToolCallRequest {
                    call_id: "a".to_string(),
                    name: "t".to_string(),
                    arguments: serde_json::json!({}),
                },
                ToolCallRequest {
                    call_id: "b".to_string(),
                    name: "t".to_string(),
                    arguments: serde_json::json!({}),
                },
            ],
        );
        transcript.push_tool_result("b", "out of order", false);
        transcript.push_tool_result("a", "late", false);

        assert!(!transcript.is_well_formed());
    }

    #[test]
    fn stray_tool_result_is_rejected() {
        let mut transcript = Transcript::new();
        transcript.push_user("hello");
        transcript.push_tool_result("ghost", "nobody asked", true);

        assert!(!transcript.is_well_formed());
    }

    #[test]
    fn failed_results_keep_the_transcript_well_formed() {
        let mut transcript = Transcript::new();
        transcript.push_user("search");
        transcript.push_assistant(
            None,
            vec![ToolCallRequest {
                call_id: "c1".to_string(),
                name: "search_papers".to_string(),
                arguments: serde_json::json!({}),
            }],
        );
        transcript.push_tool_result("c1", "Invalid arguments: missing topic", true);
        transcript.push_assistant(Some("I need a topic".to_string()), Vec::new());

        assert!(transcript.is_well_formed());
    }
}
