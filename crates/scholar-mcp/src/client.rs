//! MCP Client implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, methods};
use crate::transport::Transport;
use crate::{McpPrompt, McpResource, McpTool, PROTOCOL_VERSION, ServerCapabilities};

/// MCP Client for connecting to MCP servers
pub struct McpClient<T: Transport> {
    transport: Arc<Mutex<T>>,
    request_id: AtomicI64,
    server_capabilities: Option<ServerCapabilities>,
}

impl<T: Transport> McpClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            request_id: AtomicI64::new(1),
            server_capabilities: None,
        }
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Initialize the connection
    pub async fn initialize(&mut self, client_info: ClientInfo) -> Result<ServerInfo, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": client_info.name,
                "version": client_info.version
            }
        });

        let request = JsonRpcRequest::new(self.next_id(), methods::INITIALIZE).with_params(params);

        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            let server_info: InitializeResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(e.to_string()))?;

            self.server_capabilities = Some(server_info.capabilities.clone());

            // Send initialized notification
            let notification = serde_json::json!({
                "jsonrpc": "2.0",
                "method": methods::INITIALIZED
            });

            let mut transport = self.transport.lock().await;
            transport
                .send(notification)
                .await
                .map_err(|e| McpError::Transport(e.to_string()))?;

            Ok(ServerInfo {
                name: server_info.server_info.name,
                version: server_info.server_info.version,
            })
        } else if let Some(error) = response.error {
            Err(McpError::Server(error.message))
        } else {
            Err(McpError::Protocol("Empty response".to_string()))
        }
    }

    /// List available tools
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let request = JsonRpcRequest::new(self.next_id(), methods::TOOLS_LIST);
        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            let tools_result: ToolsListResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(e.to_string()))?;
            Ok(tools_result.tools)
        } else {
            Ok(Vec::new())
        }
    }

    /// Call a tool
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let request = JsonRpcRequest::new(self.next_id(), methods::TOOLS_CALL).with_params(params);

        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            serde_json::from_value(result).map_err(|e| McpError::Protocol(e.to_string()))
        } else if let Some(error) = response.error {
            Err(McpError::Server(error.message))
        } else {
            Err(McpError::Protocol("Empty response".to_string()))
        }
    }

    /// List resources
    pub async fn list_resources(&self) -> Result<Vec<McpResource>, McpError> {
        let request = JsonRpcRequest::new(self.next_id(), methods::RESOURCES_LIST);
        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            let resources_result: ResourcesListResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(e.to_string()))?;
            Ok(resources_result.resources)
        } else {
            Ok(Vec::new())
        }
    }

    /// Read a resource by URI
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, McpError> {
        let params = serde_json::json!({ "uri": uri });
        let request =
            JsonRpcRequest::new(self.next_id(), methods::RESOURCES_READ).with_params(params);

        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            let read_result: ResourcesReadResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(e.to_string()))?;
            Ok(read_result.contents)
        } else if let Some(error) = response.error {
            Err(McpError::Server(error.message))
        } else {
            Err(McpError::Protocol("Empty response".to_string()))
        }
    }

    /// List prompt templates
    pub async fn list_prompts(&self) -> Result<Vec<McpPrompt>, McpError> {
        let request = JsonRpcRequest::new(self.next_id(), methods::PROMPTS_LIST);
        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            let prompts_result: PromptsListResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(e.to_string()))?;
            Ok(prompts_result.prompts)
        } else {
            Ok(Vec::new())
        }
    }

    /// Render a prompt template with bound arguments
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<PromptResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let request = JsonRpcRequest::new(self.next_id(), methods::PROMPTS_GET).with_params(params);

        let response = self.send_request(request).await?;

        if let Some(result) = response.result {
            serde_json::from_value(result).map_err(|e| McpError::Protocol(e.to_string()))
        } else if let Some(error) = response.error {
            Err(McpError::Server(error.message))
        } else {
            Err(McpError::Protocol("Empty response".to_string()))
        }
    }

    /// Close the underlying transport
    pub async fn shutdown(&self) -> Result<(), McpError> {
        let mut transport = self.transport.lock().await;
        transport
            .close()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))
    }

    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let mut transport = self.transport.lock().await;

        let request_value =
            serde_json::to_value(&request).map_err(|e| McpError::Protocol(e.to_string()))?;

        transport
            .send(request_value)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        let response_value = transport
            .receive()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?
            .ok_or_else(|| McpError::Transport("Connection closed".to_string()))?;

        serde_json::from_value(response_value).map_err(|e| McpError::Protocol(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, serde::Deserialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    #[allow(dead_code)]
    protocol_version: String,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfoInner,
}

#[derive(Debug, serde::Deserialize)]
struct ServerInfoInner {
    name: String,
    version: String,
}

#[derive(Debug, serde::Deserialize)]
struct ToolsListResult {
    tools: Vec<McpTool>,
}

#[derive(Debug, serde::Deserialize)]
struct ResourcesListResult {
    resources: Vec<McpResource>,
}

#[derive(Debug, serde::Deserialize)]
struct ResourcesReadResult {
    contents: Vec<ResourceContents>,
}

#[derive(Debug, serde::Deserialize)]
struct PromptsListResult {
    prompts: Vec<McpPrompt>,
}

/// One content block of a read resource
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub text: Option<String>,
}

/// Result of a rendered prompt
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptResultMessage>,
}

impl PromptResult {
    /// Concatenated text of all message content blocks
    pub fn joined_text(&self) -> String {
        self.messages
            .iter()
            .filter_map(|m| m.content.text.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PromptResultMessage {
    pub role: String,
    pub content: ContentItem,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Concatenated text of all content items
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| item.text.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<String>,
}

/// MCP errors
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Server error: {0}")]
    Server(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex as StdMutex;

    /// Transport that replays canned replies and records what was sent
    struct ScriptedTransport {
        sent: Arc<StdMutex<Vec<Value>>>,
        replies: VecDeque<Value>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Value>) -> (Self, Arc<StdMutex<Vec<Value>>>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            (
                Self {
                    sent: sent.clone(),
                    replies: replies.into(),
                },
                sent,
            )
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, message: Value) -> io::Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn receive(&mut self) -> io::Result<Option<Value>> {
            Ok(self.replies.pop_front())
        }

        async fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn init_reply(id: i64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": { "name": "research", "version": "0.1.0" }
            }
        })
    }

    #[tokio::test]
    async fn initialize_handshake_sends_notification() {
        let (transport, sent) = ScriptedTransport::new(vec![init_reply(1)]);
        let mut client = McpClient::new(transport);

        let info = client
            .initialize(ClientInfo {
                name: "scholar".to_string(),
                version: "0.1.0".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(info.name, "research");

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["method"], "initialize");
        assert_eq!(sent[0]["params"]["clientInfo"]["name"], "scholar");
        // The follow-up notification carries no id
        assert_eq!(sent[1]["method"], "notifications/initialized");
        assert!(sent[1].get("id").is_none());
    }

    #[tokio::test]
    async fn call_tool_parses_in_band_errors() {
        let (transport, _sent) = ScriptedTransport::new(vec![json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "content": [{ "type": "text", "text": "boom" }],
                "isError": true
            }
        })]);
        let client = McpClient::new(transport);

        let result = client
            .call_tool("explode", json!({ "topic": "x" }))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(result.text(), "boom");
    }

    #[tokio::test]
    async fn server_errors_are_surfaced() {
        let (transport, _sent) = ScriptedTransport::new(vec![json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "Prompt error: no such prompt" }
        })]);
        let client = McpClient::new(transport);

        let result = client.get_prompt("missing", Default::default()).await;
        assert!(matches!(
            result,
            Err(McpError::Server(message)) if message.contains("no such prompt")
        ));
    }

    #[tokio::test]
    async fn closed_transport_is_a_transport_error() {
        let (transport, _sent) = ScriptedTransport::new(Vec::new());
        let client = McpClient::new(transport);

        let result = client.list_tools().await;
        assert!(matches!(result, Err(McpError::Transport(_))));
    }
}
