//! The MCP handler wiring tools, prompts, and resources together

use std::collections::HashMap;
use std::sync::Arc;

use scholar_mcp::server::{McpHandler, PromptContent, PromptMessage, ResourceContent};
use scholar_mcp::{McpPrompt, McpResource, McpTool};
use serde_json::Value;

use crate::arxiv::ArxivClient;
use crate::prompts::PromptCatalog;
use crate::registry::{RegistryError, ToolRegistry};
use crate::resources::ResourceSet;
use crate::store::PaperStore;
use crate::tools::{ExtractInfo, SearchPapers};

/// Request handler for the research server
pub struct ResearchHandler {
    registry: ToolRegistry,
    prompts: PromptCatalog,
    resources: ResourceSet,
}

impl ResearchHandler {
    /// Build a handler over a paper store, talking to the real arXiv API
    pub fn new(store: PaperStore) -> Result<Self, RegistryError> {
        Self::with_arxiv(Arc::new(store), Arc::new(ArxivClient::new()))
    }

    /// Build a handler with an explicit arXiv client (used by tests)
    pub fn with_arxiv(
        store: Arc<PaperStore>,
        arxiv: Arc<ArxivClient>,
    ) -> Result<Self, RegistryError> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchPapers::new(arxiv, store.clone())))?;
        registry.register(Arc::new(ExtractInfo::new(store.clone())))?;

        Ok(Self {
            registry,
            prompts: PromptCatalog::new(),
            resources: ResourceSet::new(store),
        })
    }
}

impl McpHandler for ResearchHandler {
    async fn list_tools(&self) -> Vec<McpTool> {
        self.registry.declarations()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, String> {
        match self.registry.invoke(name, arguments).await {
            Ok(output) if output.success => Ok(output.content),
            Ok(output) => Err(output
                .error
                .unwrap_or_else(|| "Tool execution failed".to_string())),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn list_resources(&self) -> Vec<McpResource> {
        self.resources.declarations()
    }

    async fn read_resource(&self, uri: &str) -> Result<ResourceContent, String> {
        let text = self.resources.read(uri).map_err(|e| e.to_string())?;

        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: Some("text/markdown".to_string()),
            text: Some(text),
        })
    }

    async fn list_prompts(&self) -> Vec<McpPrompt> {
        self.prompts.declarations()
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<PromptContent, String> {
        let text = self
            .prompts
            .render(name, &arguments)
            .map_err(|e| e.to_string())?;

        Ok(PromptContent {
            description: None,
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: text,
            }],
        })
    }
}
