//! Prompt templates
//!
//! A template turns bound argument values into seed text for the chat
//! transcript. Declarations are advertised over the wire like tools.

use std::collections::HashMap;

use scholar_mcp::{McpPrompt, PromptArgument};

/// Prompt errors
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt not found: {0}")]
    Unknown(String),

    #[error("Missing required argument '{0}'")]
    MissingArgument(String),
}

const GENERATE_SEARCH_PROMPT: &str = "generate_search_prompt";

/// The set of prompt templates this server declares
#[derive(Debug, Default)]
pub struct PromptCatalog;

impl PromptCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Wire declarations for all templates
    pub fn declarations(&self) -> Vec<McpPrompt> {
        vec![McpPrompt {
            name: GENERATE_SEARCH_PROMPT.to_string(),
            description: Some(
                "Generate a prompt that searches for papers on a topic and summarizes the findings"
                    .to_string(),
            ),
            arguments: vec![
                PromptArgument {
                    name: "topic".to_string(),
                    description: Some("The topic to search papers for".to_string()),
                    required: true,
                },
                PromptArgument {
                    name: "num_papers".to_string(),
                    description: Some("Number of papers to retrieve (default: 5)".to_string()),
                    required: false,
                },
            ],
        }]
    }

    /// Render a template with bound arguments
    pub fn render(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<String, PromptError> {
        match name {
            GENERATE_SEARCH_PROMPT => {
                let topic = arguments
                    .get("topic")
                    .ok_or_else(|| PromptError::MissingArgument("topic".to_string()))?;
                let num_papers = arguments
                    .get("num_papers")
                    .map(String::as_str)
                    .unwrap_or("5");

                Ok(format!(
                    "Search for {num_papers} academic papers about '{topic}' using the \
search_papers tool.\n\n\
Follow these instructions:\n\
1. First, call search_papers with topic '{topic}' and max_results {num_papers}.\n\
2. For each paper ID returned, call extract_info to get its details.\n\
3. Present each paper clearly: title, authors, publication date, and a short \
summary of its key contribution.\n\
4. Close with a synthesis of the current state of research on '{topic}': common \
themes, notable gaps, and promising directions.\n\n\
Organize the answer with headings so it is easy to scan."
                ))
            }
            other => Err(PromptError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_binds_arguments() {
        let catalog = PromptCatalog::new();
        let mut args = HashMap::new();
        args.insert("topic".to_string(), "robotics".to_string());
        args.insert("num_papers".to_string(), "3".to_string());

        let text = catalog.render("generate_search_prompt", &args).unwrap();
        assert!(text.contains("3 academic papers about 'robotics'"));
        assert!(text.contains("max_results 3"));
    }

    #[test]
    fn num_papers_defaults_to_five() {
        let catalog = PromptCatalog::new();
        let mut args = HashMap::new();
        args.insert("topic".to_string(), "ai safety".to_string());

        let text = catalog.render("generate_search_prompt", &args).unwrap();
        assert!(text.contains("5 academic papers"));
    }

    #[test]
    fn missing_topic_is_an_error() {
        let catalog = PromptCatalog::new();
        let result = catalog.render("generate_search_prompt", &HashMap::new());
        assert!(matches!(result, Err(PromptError::MissingArgument(arg)) if arg == "topic"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let catalog = PromptCatalog::new();
        let result = catalog.render("nonexistent", &HashMap::new());
        assert!(matches!(result, Err(PromptError::Unknown(_))));
    }

    #[test]
    fn declarations_mark_topic_as_required() {
        let declarations = PromptCatalog::new().declarations();
        assert_eq!(declarations.len(), 1);

        let topic = &declarations[0].arguments[0];
        assert_eq!(topic.name, "topic");
        assert!(topic.required);
        assert!(!declarations[0].arguments[1].required);
    }
}
