//! Tool registry
//!
//! Tools are the operations the server exposes to callers. Each tool has:
//! - A name and description for the model
//! - A JSON schema for its arguments
//! - An execute method
//!
//! The registry validates arguments against the declared schema before any
//! handler runs, and refuses to register two tools under one name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scholar_mcp::McpTool;

/// Boxed future type for object-safe async trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateName(String),

    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool succeeded
    pub success: bool,
    /// The output content (text or JSON)
    pub content: Value,
    /// Optional error message
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(content: impl Into<Value>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: Value::Null,
            error: Some(message.into()),
        }
    }
}

/// Core trait for all tools
pub trait Tool: Send + Sync {
    /// Tool name (used by the model to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema for arguments
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with validated arguments
    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, RegistryError>>;

    /// Convert to the wire declaration
    fn to_declaration(&self) -> McpTool {
        McpTool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, for stable listings
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A name can only be claimed once.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Wire declarations for all tools, in registration order
    pub fn declarations(&self) -> Vec<McpTool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_declaration())
            .collect()
    }

    /// Validate arguments against the declared schema, then execute.
    ///
    /// Validation failures never reach the handler.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolOutput, RegistryError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;

        validate_arguments(&tool.parameters_schema(), &arguments)?;

        tool.execute(arguments).await
    }
}

/// Check the argument map against a JSON schema: required keys must be
/// present and declared primitive types must match. Undeclared keys pass
/// through untouched.
fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), RegistryError> {
    let args = arguments
        .as_object()
        .ok_or_else(|| RegistryError::InvalidArguments("arguments must be an object".into()))?;

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !args.contains_key(key) {
                return Err(RegistryError::InvalidArguments(format!(
                    "missing required argument '{}'",
                    key
                )));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(declared) = properties.get(key).and_then(|p| p.get("type")) else {
            continue;
        };
        let Some(expected) = declared.as_str() else {
            continue;
        };

        let matches = match expected {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };

        if !matches {
            return Err(RegistryError::InvalidArguments(format!(
                "argument '{}' must be of type {}",
                key, expected
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Doubler;

    impl Tool for Doubler {
        fn name(&self) -> &str {
            "double"
        }

        fn description(&self) -> &str {
            "Double a number"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "value": { "type": "integer", "description": "Number to double" },
                    "label": { "type": "string", "description": "Optional label" }
                },
                "required": ["value"]
            })
        }

        fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, RegistryError>> {
            Box::pin(async move {
                let value = params["value"].as_i64().unwrap_or_default();
                Ok(ToolOutput::success(json!(value * 2)))
            })
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Doubler)).unwrap();
        registry
    }

    #[tokio::test]
    async fn invoke_runs_the_handler() {
        let output = registry()
            .invoke("double", json!({ "value": 21 }))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.content, json!(42));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = registry();
        let result = registry.register(Arc::new(Doubler));
        assert!(matches!(result, Err(RegistryError::DuplicateName(name)) if name == "double"));
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let result = registry().invoke("triple", json!({})).await;
        assert!(matches!(result, Err(RegistryError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn missing_required_argument_is_rejected_before_execution() {
        let result = registry().invoke("double", json!({})).await;
        match result {
            Err(RegistryError::InvalidArguments(message)) => assert!(message.contains("value")),
            other => panic!("expected invalid arguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn wrong_argument_type_is_rejected() {
        let result = registry()
            .invoke("double", json!({ "value": "twenty-one" }))
            .await;
        match result {
            Err(RegistryError::InvalidArguments(message)) => assert!(message.contains("integer")),
            other => panic!("expected invalid arguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn undeclared_arguments_pass_through() {
        let output = registry()
            .invoke("double", json!({ "value": 2, "extra": true }))
            .await
            .unwrap();
        assert!(output.success);
    }

    #[test]
    fn declarations_follow_registration_order() {
        let declarations = registry().declarations();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "double");
        assert_eq!(declarations[0].input_schema["required"][0], "value");
    }
}
