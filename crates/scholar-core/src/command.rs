//! Chat input parsing
//!
//! Inputs beginning with a recognized marker are routed around the completion
//! endpoint: `@` fetches a resource, `/` runs a command. Everything else is a
//! model query. Parsing never touches the transcript.

use std::collections::HashMap;

/// A parsed line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Exit the chat loop
    Quit,
    /// Fetch and display a resource
    Resource { uri: String },
    /// List available prompt templates
    ListPrompts,
    /// Render a prompt template and inject it as the next user turn
    RenderPrompt {
        name: String,
        args: HashMap<String, String>,
    },
    /// Forward free text to the model
    Query { text: String },
    /// Unrecognized marker; report without mutating the transcript
    Usage { message: String },
}

/// Parse one line of input. Returns `None` for blank lines.
pub fn parse_input(input: &str) -> Option<ChatInput> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.eq_ignore_ascii_case("quit") {
        return Some(ChatInput::Quit);
    }

    if let Some(topic) = input.strip_prefix('@') {
        if topic.is_empty() {
            return Some(ChatInput::Usage {
                message: "Usage: @folders or @<topic>".to_string(),
            });
        }
        let uri = format!("papers://{}", topic);
        return Some(ChatInput::Resource { uri });
    }

    if input.starts_with('/') {
        return Some(parse_command(input));
    }

    Some(ChatInput::Query {
        text: input.to_string(),
    })
}

fn parse_command(input: &str) -> ChatInput {
    let mut parts = input.split_whitespace();
    let command = parts.next().unwrap_or_default();

    match command {
        "/prompts" => ChatInput::ListPrompts,
        "/prompt" => {
            let Some(name) = parts.next() else {
                return ChatInput::Usage {
                    message: "Usage: /prompt <name> <arg1=value1> <arg2=value2>".to_string(),
                };
            };

            // Arguments not of key=value shape are ignored
            let args = parts
                .filter_map(|part| {
                    part.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                })
                .collect();

            ChatInput::RenderPrompt {
                name: name.to_string(),
                args,
            }
        }
        other => ChatInput::Usage {
            message: format!("Unknown command: {}", other),
        },
    }
}
