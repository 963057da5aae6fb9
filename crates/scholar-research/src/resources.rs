//! Read-only resources over the paper store
//!
//! Resources live under the `papers://` namespace: `papers://folders` lists
//! the topic directories, `papers://<topic>` renders one topic's papers as
//! markdown. Topics created after connect time resolve too; only an
//! unrecognized scheme is an error.

use std::sync::Arc;

use scholar_mcp::McpResource;

use crate::store::{PaperStore, StoreError};

/// Resource errors
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    Unknown(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

const SCHEME: &str = "papers://";
const FOLDERS_KEY: &str = "folders";

/// The `papers://` resource namespace
pub struct ResourceSet {
    store: Arc<PaperStore>,
}

impl ResourceSet {
    pub fn new(store: Arc<PaperStore>) -> Self {
        Self { store }
    }

    /// Wire declarations: the folder listing plus one entry per stored topic
    pub fn declarations(&self) -> Vec<McpResource> {
        let mut resources = vec![McpResource {
            uri: format!("{}{}", SCHEME, FOLDERS_KEY),
            name: "Paper topics".to_string(),
            description: Some("List of available topic folders".to_string()),
            mime_type: Some("text/markdown".to_string()),
        }];

        if let Ok(topics) = self.store.topics() {
            for topic in topics {
                resources.push(McpResource {
                    uri: format!("{}{}", SCHEME, topic),
                    name: topic.clone(),
                    description: Some(format!("Papers stored under the {} topic", topic)),
                    mime_type: Some("text/markdown".to_string()),
                });
            }
        }

        resources
    }

    /// Read a resource by URI
    pub fn read(&self, uri: &str) -> Result<String, ResourceError> {
        let key = uri
            .strip_prefix(SCHEME)
            .ok_or_else(|| ResourceError::Unknown(uri.to_string()))?;

        if key.is_empty() {
            return Err(ResourceError::Unknown(uri.to_string()));
        }

        if key == FOLDERS_KEY {
            self.folders_markdown()
        } else {
            self.topic_markdown(key)
        }
    }

    fn folders_markdown(&self) -> Result<String, ResourceError> {
        let topics = self.store.topics()?;

        let mut doc = String::from("# Available Topics\n\n");
        if topics.is_empty() {
            doc.push_str("No topics found.\n");
        } else {
            for topic in &topics {
                doc.push_str(&format!("- {}\n", topic));
            }
            doc.push_str("\nUse @<topic> to see papers in that topic.\n");
        }

        Ok(doc)
    }

    fn topic_markdown(&self, topic: &str) -> Result<String, ResourceError> {
        let papers = self.store.load_topic(topic)?;

        if papers.is_empty() {
            return Ok(format!(
                "# No papers found for topic: {}\n\n\
                 Try searching for papers on this topic first.\n",
                topic
            ));
        }

        let mut doc = format!("# Papers on {}\n\nTotal papers: {}\n\n", topic, papers.len());
        for (id, paper) in &papers {
            doc.push_str(&format!("## {}\n", paper.title));
            doc.push_str(&format!("- **Paper ID**: {}\n", id));
            doc.push_str(&format!("- **Authors**: {}\n", paper.authors.join(", ")));
            doc.push_str(&format!("- **Published**: {}\n", paper.published));
            doc.push_str(&format!(
                "- **PDF**: [{}]({})\n\n",
                paper.pdf_url, paper.pdf_url
            ));
            doc.push_str(&format!("### Summary\n{}\n\n---\n\n", truncate(&paper.summary, 500)));
        }

        Ok(doc)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PaperRecord;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn seeded(dir: &std::path::Path) -> ResourceSet {
        let store = PaperStore::new(dir);
        let mut papers = BTreeMap::new();
        papers.insert(
            "2301.00001v1".to_string(),
            PaperRecord {
                title: "Agents".to_string(),
                authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
                summary: "x".repeat(600),
                pdf_url: "http://arxiv.org/pdf/2301.00001v1".to_string(),
                published: "2023-01-02".to_string(),
            },
        );
        store.save_topic("llm agents", &papers).unwrap();
        ResourceSet::new(Arc::new(store))
    }

    #[test]
    fn folders_lists_topic_directories() {
        let dir = tempdir().unwrap();
        let resources = seeded(dir.path());

        let doc = resources.read("papers://folders").unwrap();
        assert!(doc.contains("# Available Topics"));
        assert!(doc.contains("- llm_agents"));
    }

    #[test]
    fn topic_document_renders_papers() {
        let dir = tempdir().unwrap();
        let resources = seeded(dir.path());

        let doc = resources.read("papers://llm_agents").unwrap();
        assert!(doc.contains("# Papers on llm_agents"));
        assert!(doc.contains("**Paper ID**: 2301.00001v1"));
        assert!(doc.contains("Ada Lovelace, Alan Turing"));
        // Long summaries are truncated
        assert!(doc.contains("..."));
    }

    #[test]
    fn unknown_topic_is_a_helpful_document() {
        let dir = tempdir().unwrap();
        let resources = seeded(dir.path());

        let doc = resources.read("papers://quantum_chess").unwrap();
        assert!(doc.contains("No papers found for topic: quantum_chess"));
    }

    #[test]
    fn foreign_scheme_is_an_error() {
        let dir = tempdir().unwrap();
        let resources = seeded(dir.path());

        assert!(matches!(
            resources.read("web://example"),
            Err(ResourceError::Unknown(_))
        ));
        assert!(matches!(
            resources.read("papers://"),
            Err(ResourceError::Unknown(_))
        ));
    }

    #[test]
    fn declarations_cover_folders_and_topics() {
        let dir = tempdir().unwrap();
        let resources = seeded(dir.path());

        let declarations = resources.declarations();
        let uris: Vec<&str> = declarations.iter().map(|r| r.uri.as_str()).collect();
        assert!(uris.contains(&"papers://folders"));
        assert!(uris.contains(&"papers://llm_agents"));
    }
}
