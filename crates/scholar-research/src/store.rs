//! Topic-partitioned paper store
//!
//! Search results are persisted as one JSON file per topic:
//! `<root>/<topic_dir>/papers_info.json`, an object keyed by paper id. The
//! topic directory name is the topic lowercased with spaces replaced by
//! underscores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Stored metadata for one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub pdf_url: String,
    pub published: String,
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

const PAPERS_FILE: &str = "papers_info.json";

/// Handle to the on-disk paper store
#[derive(Debug, Clone)]
pub struct PaperStore {
    root: PathBuf,
}

impl PaperStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name a topic is filed under
    pub fn topic_dir_name(topic: &str) -> String {
        topic.to_lowercase().replace(' ', "_")
    }

    fn topic_file(&self, topic: &str) -> PathBuf {
        self.root.join(Self::topic_dir_name(topic)).join(PAPERS_FILE)
    }

    /// Topic directories that hold a papers file, sorted
    pub fn topics(&self) -> Result<Vec<String>, StoreError> {
        let mut topics = Vec::new();

        if !self.root.exists() {
            return Ok(topics);
        }

        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() && path.join(PAPERS_FILE).exists() {
                topics.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        topics.sort();
        Ok(topics)
    }

    /// Load a topic's records. A missing file is an empty topic.
    pub fn load_topic(&self, topic: &str) -> Result<BTreeMap<String, PaperRecord>, StoreError> {
        let path = self.topic_file(topic);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a topic's records, creating the topic directory as needed
    pub fn save_topic(
        &self,
        topic: &str,
        papers: &BTreeMap<String, PaperRecord>,
    ) -> Result<(), StoreError> {
        let path = self.topic_file(topic);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(papers)?;
        std::fs::write(&path, content)?;

        tracing::debug!(topic, count = papers.len(), path = %path.display(), "saved topic");
        Ok(())
    }

    /// Search every topic for a paper id
    pub fn find(&self, paper_id: &str) -> Result<Option<PaperRecord>, StoreError> {
        for topic in self.topics()? {
            let papers = self.load_topic(&topic)?;
            if let Some(record) = papers.get(paper_id) {
                return Ok(Some(record.clone()));
            }
        }

        Ok(None)
    }
}
