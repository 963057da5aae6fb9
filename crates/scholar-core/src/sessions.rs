//! Tool server session management
//!
//! The session manager owns the connections to configured tool servers,
//! discovers what each one offers at connect time, and merges everything into
//! a single namespace the conversation loop can dispatch against. Discovery
//! results are cached for the life of the session; a name claimed by two
//! servers is a configuration error, never a silent override.

use std::collections::HashMap;

use scholar_mcp::client::{ClientInfo, McpClient, McpError, ToolCallResult};
use scholar_mcp::transport::{StdioTransport, Transport};
use scholar_mcp::{McpPrompt, McpResource, McpTool};

use crate::config::McpServerConfig;
use crate::error::{Error, Result};
use crate::provider::ToolDefinition;
use crate::transcript::ToolCallRequest;

/// One connected tool server
struct ProviderSession {
    name: String,
    client: McpClient<Box<dyn Transport>>,
}

/// Manager for tool server sessions and the aggregated capability namespace
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<String, ProviderSession>,
    /// Capability name -> owning server name
    tool_index: HashMap<String, String>,
    prompt_index: HashMap<String, String>,
    resource_index: HashMap<String, String>,
    /// Declarations cached at connect time, in discovery order
    tools: Vec<McpTool>,
    prompts: Vec<McpPrompt>,
    resources: Vec<McpResource>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to a configured server by launching its process
    pub async fn connect(&mut self, name: &str, config: &McpServerConfig) -> Result<()> {
        let transport = StdioTransport::spawn(&config.command, &config.args, &config.env)
            .await
            .map_err(|e| Error::Connection {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        self.connect_with_transport(name, Box::new(transport)).await
    }

    /// Connect over an already-established transport (used by tests)
    pub async fn connect_with_transport(
        &mut self,
        name: &str,
        transport: Box<dyn Transport>,
    ) -> Result<()> {
        let mut client = McpClient::new(transport);

        let server_info = client
            .initialize(ClientInfo {
                name: "scholar".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await
            .map_err(|e| Error::Connection {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            server = name,
            server_name = %server_info.name,
            server_version = %server_info.version,
            "connected to tool server"
        );

        self.discover(name, &client).await?;

        self.sessions.insert(
            name.to_string(),
            ProviderSession {
                name: name.to_string(),
                client,
            },
        );

        Ok(())
    }

    /// Connect to every enabled server; unreachable servers narrow the
    /// capability set, namespace collisions are fatal.
    pub async fn connect_all(
        &mut self,
        configs: &HashMap<String, McpServerConfig>,
    ) -> Result<()> {
        let mut names: Vec<&String> = configs
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(name, _)| name)
            .collect();
        names.sort();

        for name in names {
            match self.connect(name, &configs[name]).await {
                Ok(()) => {}
                Err(Error::Connection { name, reason }) => {
                    tracing::warn!(server = %name, reason = %reason, "skipping unreachable server");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Discover tools, prompts, and resources and merge them into the namespace
    async fn discover(&mut self, name: &str, client: &McpClient<Box<dyn Transport>>) -> Result<()> {
        // Servers are not required to implement every capability type; a
        // failed listing leaves that type empty for this server.
        let tools = client.list_tools().await.unwrap_or_else(|e| {
            tracing::warn!(server = name, error = %e, "could not list tools");
            Vec::new()
        });
        let prompts = client.list_prompts().await.unwrap_or_else(|e| {
            tracing::warn!(server = name, error = %e, "could not list prompts");
            Vec::new()
        });
        let resources = client.list_resources().await.unwrap_or_else(|e| {
            tracing::warn!(server = name, error = %e, "could not list resources");
            Vec::new()
        });

        for tool in &tools {
            Self::claim(&mut self.tool_index, &tool.name, name)?;
        }
        for prompt in &prompts {
            Self::claim(&mut self.prompt_index, &prompt.name, name)?;
        }
        for resource in &resources {
            Self::claim(&mut self.resource_index, &resource.uri, name)?;
        }

        tracing::info!(
            server = name,
            tools = tools.len(),
            prompts = prompts.len(),
            resources = resources.len(),
            "discovered capabilities"
        );

        self.tools.extend(tools);
        self.prompts.extend(prompts);
        self.resources.extend(resources);

        Ok(())
    }

    fn claim(index: &mut HashMap<String, String>, name: &str, server: &str) -> Result<()> {
        if let Some(first) = index.get(name) {
            return Err(Error::CapabilityCollision {
                name: name.to_string(),
                first: first.clone(),
                second: server.to_string(),
            });
        }
        index.insert(name.to_string(), server.to_string());
        Ok(())
    }

    /// Route a tool invocation request to the server that owns the tool.
    ///
    /// An unknown tool name fails before any server I/O happens.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> Result<ToolCallResult> {
        let server = self
            .tool_index
            .get(&request.name)
            .ok_or_else(|| Error::UnknownTool(request.name.clone()))?;

        let session = self
            .sessions
            .get(server)
            .ok_or_else(|| Error::UnknownTool(request.name.clone()))?;

        tracing::debug!(
            tool = %request.name,
            call_id = %request.call_id,
            server = %session.name,
            "dispatching tool call"
        );

        session
            .client
            .call_tool(&request.name, request.arguments.clone())
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))
    }

    /// Read a resource, routing by exact URI first and falling back to any
    /// server that owns the same `scheme://` namespace. The fallback is what
    /// lets `papers://<new-topic>` reach the research server for topics
    /// created after connect time.
    pub async fn read_resource(&self, uri: &str) -> Result<String> {
        let server = match self.resource_index.get(uri) {
            Some(server) => Some(server.clone()),
            None => uri.find("://").and_then(|idx| {
                let namespace = &uri[..idx + 3];
                self.resource_index
                    .iter()
                    .find(|(declared, _)| declared.starts_with(namespace))
                    .map(|(_, server)| server.clone())
            }),
        };

        let server = server.ok_or_else(|| Error::UnknownResource(uri.to_string()))?;
        let session = self
            .sessions
            .get(&server)
            .ok_or_else(|| Error::UnknownResource(uri.to_string()))?;

        let contents = session.client.read_resource(uri).await.map_err(|e| match e {
            McpError::Server(message) => Error::UnknownResource(message),
            other => Error::Dispatch(other.to_string()),
        })?;

        let text = contents
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(Error::UnknownResource(format!(
                "{} has no text content",
                uri
            )));
        }

        Ok(text)
    }

    /// Render a prompt template on the server that declares it
    pub async fn render_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<String> {
        let server = self
            .prompt_index
            .get(name)
            .ok_or_else(|| Error::UnknownPrompt(name.to_string()))?;

        let session = self
            .sessions
            .get(server)
            .ok_or_else(|| Error::UnknownPrompt(name.to_string()))?;

        let result = session
            .client
            .get_prompt(name, arguments)
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;

        Ok(result.joined_text())
    }

    /// Aggregated tool declarations in the shape the completion endpoint expects
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            })
            .collect()
    }

    /// Cached prompt declarations
    pub fn prompts(&self) -> &[McpPrompt] {
        &self.prompts
    }

    /// Cached resource declarations
    pub fn resources(&self) -> &[McpResource] {
        &self.resources
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Names of connected servers
    pub fn server_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sessions.values().map(|s| s.name.as_str()).collect();
        names.sort();
        names
    }

    /// Close all server connections.
    ///
    /// Server processes are spawned kill-on-drop, so they also die on exit
    /// paths that never reach this.
    pub async fn shutdown(&mut self) {
        for session in self.sessions.values() {
            if let Err(e) = session.client.shutdown().await {
                tracing::warn!(server = %session.name, error = %e, "error closing session");
            }
        }

        self.sessions.clear();
        self.tool_index.clear();
        self.prompt_index.clear();
        self.resource_index.clear();
        self.tools.clear();
        self.prompts.clear();
        self.resources.clear();
    }
}
