//! Shared fixtures: an in-memory tool server and a scripted completion
//! provider, so the loop and session tests exercise the real client,
//! server, and dispatch code without child processes or network.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use scholar_core::error::{Error, Result};
use scholar_core::provider::{CompletionResult, LlmProvider, PendingToolCall, ToolDefinition};
use scholar_core::transcript::Turn;
use scholar_mcp::protocol::JsonRpcRequest;
use scholar_mcp::server::{McpHandler, McpServer, PromptContent, PromptMessage, ResourceContent};
use scholar_mcp::transport::Transport;
use scholar_mcp::{McpPrompt, McpResource, McpTool, PromptArgument};

/// A research-style handler with a configurable tool list and a call counter.
///
/// Any tool named `explode` fails; every other tool returns a fixed list of
/// paper ids. `papers://` URIs resolve whether or not they were declared,
/// mirroring topic folders created after connect time.
pub struct StubHandler {
    tool_names: Vec<String>,
    pub calls: AtomicUsize,
}

impl StubHandler {
    pub fn new(tool_names: &[&str]) -> Self {
        Self {
            tool_names: tool_names.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl McpHandler for StubHandler {
    async fn list_tools(&self) -> Vec<McpTool> {
        self.tool_names
            .iter()
            .map(|name| McpTool {
                name: name.clone(),
                description: format!("Stub tool {}", name),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string" },
                        "max_results": { "type": "integer" }
                    },
                    "required": ["topic"]
                }),
            })
            .collect()
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> std::result::Result<Value, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "explode" => Err("boom".to_string()),
            _ => Ok(json!(["2301.00001", "2301.00002"])),
        }
    }

    async fn list_resources(&self) -> Vec<McpResource> {
        vec![McpResource {
            uri: "papers://folders".to_string(),
            name: "folders".to_string(),
            description: Some("Available topic folders".to_string()),
            mime_type: Some("text/markdown".to_string()),
        }]
    }

    async fn read_resource(&self, uri: &str) -> std::result::Result<ResourceContent, String> {
        let Some(key) = uri.strip_prefix("papers://") else {
            return Err(format!("No resource matches {}", uri));
        };

        let text = if key == "folders" {
            "# Available Topics\n- llm_agents\n".to_string()
        } else {
            format!("# Papers on {}\n", key)
        };

        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: Some("text/markdown".to_string()),
            text: Some(text),
        })
    }

    async fn list_prompts(&self) -> Vec<McpPrompt> {
        vec![McpPrompt {
            name: "generate_search_prompt".to_string(),
            description: Some("Seed a paper search conversation".to_string()),
            arguments: vec![
                PromptArgument {
                    name: "topic".to_string(),
                    description: Some("Topic to search for".to_string()),
                    required: true,
                },
                PromptArgument {
                    name: "num_papers".to_string(),
                    description: Some("How many papers to fetch".to_string()),
                    required: false,
                },
            ],
        }]
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> std::result::Result<PromptContent, String> {
        if name != "generate_search_prompt" {
            return Err(format!("No prompt named {}", name));
        }

        let Some(topic) = arguments.get("topic") else {
            return Err("Missing required argument: topic".to_string());
        };
        let num = arguments
            .get("num_papers")
            .cloned()
            .unwrap_or_else(|| "5".to_string());

        Ok(PromptContent {
            description: None,
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: format!("Search for {} papers about {}.", num, topic),
            }],
        })
    }
}

/// Transport that answers requests by running them through a real `McpServer`
pub struct StubServerTransport {
    server: McpServer<StubHandler>,
    pending: VecDeque<Value>,
}

impl StubServerTransport {
    pub fn new(handler: Arc<StubHandler>) -> Self {
        Self {
            server: McpServer::new(handler).with_name("stub-server"),
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl Transport for StubServerTransport {
    async fn send(&mut self, message: Value) -> io::Result<()> {
        // Notifications get no reply
        if message.get("id").is_none() {
            return Ok(());
        }

        let request: JsonRpcRequest = serde_json::from_value(message)?;
        let response = self.server.handle_request(request).await;
        self.pending.push_back(serde_json::to_value(response)?);
        Ok(())
    }

    async fn receive(&mut self) -> io::Result<Option<Value>> {
        Ok(self.pending.pop_front())
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Completion provider that replays a fixed script of results.
///
/// An exhausted script fails like a transport error, which doubles as the
/// endpoint-failure fixture.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<CompletionResult>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<CompletionResult>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    pub fn push(&self, response: CompletionResult) {
        self.responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _turns: &[Turn], _tools: &[ToolDefinition]) -> Result<CompletionResult> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Provider("connection reset by peer".to_string()))
    }
}

/// A text-only completion
pub fn text_reply(text: &str) -> CompletionResult {
    CompletionResult {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

/// A completion requesting the given tool calls
pub fn tool_reply(calls: &[(&str, &str, Value)]) -> CompletionResult {
    CompletionResult {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(call_id, name, arguments)| PendingToolCall {
                call_id: call_id.to_string(),
                name: name.to_string(),
                arguments: arguments.clone(),
            })
            .collect(),
    }
}
