//! Knowledge Base Loader
//!
//! Loads pre-chunked knowledge documents from YAML/JSON files. Parsing PDFs
//! and chunking them happens upstream; each entry here is one retrievable
//! chunk with its page metadata.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::RagError;

/// One chunk in a knowledge file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Unique chunk ID
    pub id: String,
    /// Source document the chunk was cut from (e.g. "manual.pdf")
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Page number within the source document
    #[serde(default)]
    pub page: Option<u32>,
    /// Character offset within the page
    #[serde(default)]
    pub offset: Option<usize>,
    /// Chunk text
    pub content: String,
}

impl KnowledgeDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
            title: None,
            page: None,
            offset: None,
            content: content.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Document id used in citations: the source file when known, else the chunk id
    pub fn document_id(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.id)
    }
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    /// List of chunks
    pub documents: Vec<KnowledgeDocument>,
}

/// Knowledge loader
pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Load knowledge from a single file or a directory of files
    ///
    /// A missing path is not an error: it yields no documents and the
    /// retriever reports the index as unavailable (web-only mode).
    pub fn load_path(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Knowledge path does not exist"
            );
            return Ok(Vec::new());
        }

        if path.is_file() {
            let documents = Self::load_file(path)?;
            tracing::info!(
                file = %path.display(),
                documents = documents.len(),
                "Loaded knowledge file"
            );
            return Ok(documents);
        }

        Self::load_directory(path)
    }

    /// Load every YAML/JSON file in a directory
    ///
    /// Files are read in name order so the index, and therefore tie-breaking
    /// between equal scores, is reproducible. Unparseable files are logged
    /// and skipped.
    pub fn load_directory(knowledge_dir: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let entries = std::fs::read_dir(knowledge_dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory: {}", e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| RagError::Index(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if is_knowledge_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            match Self::load_file(&path) {
                Ok(loaded) => {
                    tracing::info!(
                        file = %path.display(),
                        documents = loaded.len(),
                        "Loaded knowledge file"
                    );
                    documents.extend(loaded);
                },
                Err(e) => {
                    tracing::error!(
                        file = %path.display(),
                        error = %e,
                        "Failed to load knowledge file"
                    );
                },
            }
        }

        tracing::info!(
            directory = %knowledge_dir.display(),
            total_documents = documents.len(),
            "Knowledge base loading complete"
        );

        Ok(documents)
    }

    /// Load a single knowledge file
    pub fn load_file(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let knowledge: KnowledgeFile = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Parse(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Parse(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(RagError::Parse(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            },
        };

        Ok(knowledge
            .documents
            .into_iter()
            .filter(|d| !d.content.trim().is_empty())
            .collect())
    }
}

fn is_knowledge_file(path: &Path) -> bool {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    path.is_file() && matches!(extension, "yaml" | "yml" | "json")
}
