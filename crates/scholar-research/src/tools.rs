//! The research tools: paper search and metadata lookup

use serde_json::{Value, json};
use std::sync::Arc;

use crate::arxiv::ArxivClient;
use crate::registry::{BoxFuture, RegistryError, Tool, ToolOutput};
use crate::store::{PaperRecord, PaperStore};

/// Search arXiv for papers on a topic and persist their metadata
pub struct SearchPapers {
    arxiv: Arc<ArxivClient>,
    store: Arc<PaperStore>,
}

impl SearchPapers {
    pub fn new(arxiv: Arc<ArxivClient>, store: Arc<PaperStore>) -> Self {
        Self { arxiv, store }
    }

    async fn search(&self, topic: &str, max_results: usize) -> Result<ToolOutput, RegistryError> {
        let papers = self
            .arxiv
            .search(topic, max_results)
            .await
            .map_err(|e| RegistryError::Execution(format!("arXiv query failed: {}", e)))?;

        let mut stored = self
            .store
            .load_topic(topic)
            .map_err(|e| RegistryError::Execution(e.to_string()))?;

        let ids: Vec<String> = papers.iter().map(|p| p.id.clone()).collect();

        for paper in papers {
            stored.insert(
                paper.id.clone(),
                PaperRecord {
                    title: paper.title,
                    authors: paper.authors,
                    summary: paper.summary,
                    pdf_url: paper.pdf_url,
                    published: paper.published,
                },
            );
        }

        self.store
            .save_topic(topic, &stored)
            .map_err(|e| RegistryError::Execution(e.to_string()))?;

        tracing::info!(topic, found = ids.len(), "stored search results");
        Ok(ToolOutput::success(json!(ids)))
    }
}

impl Tool for SearchPapers {
    fn name(&self) -> &str {
        "search_papers"
    }

    fn description(&self) -> &str {
        "Search arXiv for papers on a topic, store their metadata locally, \
         and return the list of paper IDs found"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "The topic to search for"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to retrieve (default: 5)"
                }
            },
            "required": ["topic"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, RegistryError>> {
        Box::pin(async move {
            let topic = params["topic"]
                .as_str()
                .ok_or_else(|| {
                    RegistryError::InvalidArguments("missing required argument 'topic'".into())
                })?
                .to_string();
            let max_results = params
                .get("max_results")
                .and_then(|v| v.as_u64())
                .unwrap_or(5) as usize;

            self.search(&topic, max_results).await
        })
    }
}

/// Look up stored metadata for a paper by its id, across all topics
pub struct ExtractInfo {
    store: Arc<PaperStore>,
}

impl ExtractInfo {
    pub fn new(store: Arc<PaperStore>) -> Self {
        Self { store }
    }
}

impl Tool for ExtractInfo {
    fn name(&self) -> &str {
        "extract_info"
    }

    fn description(&self) -> &str {
        "Look up stored information about a paper by its ID, across all topics"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paper_id": {
                    "type": "string",
                    "description": "The ID of the paper to look up"
                }
            },
            "required": ["paper_id"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, RegistryError>> {
        Box::pin(async move {
            let paper_id = params["paper_id"].as_str().ok_or_else(|| {
                RegistryError::InvalidArguments("missing required argument 'paper_id'".into())
            })?;

            let found = self
                .store
                .find(paper_id)
                .map_err(|e| RegistryError::Execution(e.to_string()))?;

            match found {
                Some(record) => {
                    let pretty = serde_json::to_string_pretty(&record)
                        .map_err(|e| RegistryError::Execution(e.to_string()))?;
                    Ok(ToolOutput::success(Value::String(pretty)))
                }
                // A miss is an answer, not a failure; the model decides what
                // to do with it
                None => Ok(ToolOutput::success(Value::String(format!(
                    "There's no saved information related to paper {}.",
                    paper_id
                )))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn seeded_store(dir: &std::path::Path) -> Arc<PaperStore> {
        let store = PaperStore::new(dir);
        let mut papers = BTreeMap::new();
        papers.insert(
            "2301.00001v1".to_string(),
            PaperRecord {
                title: "Agents".to_string(),
                authors: vec!["Ada Lovelace".to_string()],
                summary: "About agents.".to_string(),
                pdf_url: "http://arxiv.org/pdf/2301.00001v1".to_string(),
                published: "2023-01-02".to_string(),
            },
        );
        store.save_topic("llm agents", &papers).unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn extract_info_returns_pretty_json_for_known_papers() {
        let dir = tempdir().unwrap();
        let tool = ExtractInfo::new(seeded_store(dir.path()));

        let output = tool
            .execute(json!({ "paper_id": "2301.00001v1" }))
            .await
            .unwrap();

        assert!(output.success);
        let text = output.content.as_str().unwrap();
        assert!(text.contains("\"title\": \"Agents\""));
    }

    #[tokio::test]
    async fn extract_info_miss_is_a_successful_answer() {
        let dir = tempdir().unwrap();
        let tool = ExtractInfo::new(seeded_store(dir.path()));

        let output = tool
            .execute(json!({ "paper_id": "9999.00000" }))
            .await
            .unwrap();

        assert!(output.success);
        assert!(
            output
                .content
                .as_str()
                .unwrap()
                .contains("no saved information")
        );
    }

    #[tokio::test]
    async fn search_papers_rejects_bad_arguments_before_any_network_io() {
        let dir = tempdir().unwrap();
        let store = Arc::new(PaperStore::new(dir.path()));
        // Unroutable endpoint: reaching it would fail loudly
        let arxiv = Arc::new(ArxivClient::with_base_url("http://127.0.0.1:1/query"));

        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(SearchPapers::new(arxiv, store)))
            .unwrap();

        let missing = registry.invoke("search_papers", json!({})).await;
        assert!(matches!(
            missing,
            Err(RegistryError::InvalidArguments(_))
        ));

        let wrong_type = registry
            .invoke(
                "search_papers",
                json!({ "topic": "ai", "max_results": "five" }),
            )
            .await;
        assert!(matches!(
            wrong_type,
            Err(RegistryError::InvalidArguments(_))
        ));
    }
}
