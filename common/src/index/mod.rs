pub mod memory;
pub mod qdrant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, utils::config::SimilarityMetric};

use memory::MemoryIndex;
use qdrant::QdrantIndex;

/// Payload stored alongside each vector point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub file_name: String,
}

impl ChunkPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "text" => Some(&self.text),
            "file_name" => Some(&self.file_name),
            _ => None,
        }
    }
}

/// A point ready for upsert. Ids are fresh per ingestion, so re-ingesting a
/// document appends rather than replaces.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl IndexEntry {
    pub fn new(vector: Vec<f32>, text: String, file_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            payload: ChunkPayload { text, file_name },
        }
    }
}

/// A search hit, descending-similarity ordered by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub file_name: String,
    pub score: f32,
}

/// Similarity index over chunk embeddings.
///
/// The Qdrant backend talks to the store's REST API; the memory backend keeps
/// points in-process for tests and dependency-free operation.
#[derive(Clone)]
pub struct VectorIndex {
    inner: IndexInner,
}

#[derive(Clone)]
enum IndexInner {
    Qdrant(QdrantIndex),
    Memory(MemoryIndex),
}

impl VectorIndex {
    pub fn qdrant(
        base_url: &str,
        collection: &str,
        metric: SimilarityMetric,
    ) -> Result<Self, AppError> {
        Ok(Self {
            inner: IndexInner::Qdrant(QdrantIndex::new(base_url, collection, metric)?),
        })
    }

    pub fn memory(metric: SimilarityMetric) -> Self {
        Self {
            inner: IndexInner::Memory(MemoryIndex::new(metric)),
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            IndexInner::Qdrant(_) => "qdrant",
            IndexInner::Memory(_) => "memory",
        }
    }

    /// Idempotent collection bootstrap. An existing collection is never
    /// recreated; a dimension mismatch with the embedder is a fatal
    /// configuration error.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), AppError> {
        match &self.inner {
            IndexInner::Qdrant(index) => index.ensure_collection(dimension).await,
            IndexInner::Memory(index) => index.ensure_collection(dimension).await,
        }
    }

    pub async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), AppError> {
        match &self.inner {
            IndexInner::Qdrant(index) => index.upsert(entries).await,
            IndexInner::Memory(index) => index.upsert(entries).await,
        }
    }

    /// Top-k search. An empty corpus yields an empty vec, not an error.
    pub async fn search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        match &self.inner {
            IndexInner::Qdrant(index) => index.search(vector, limit).await,
            IndexInner::Memory(index) => index.search(vector, limit).await,
        }
    }

    /// Exact-match delete; a no-op when nothing matches.
    pub async fn delete_by_filter(&self, field: &str, value: &str) -> Result<(), AppError> {
        match &self.inner {
            IndexInner::Qdrant(index) => index.delete_by_filter(field, value).await,
            IndexInner::Memory(index) => index.delete_by_filter(field, value).await,
        }
    }

    /// Distinct payload values across the whole corpus, sorted. Pages through
    /// the backend's scroll API so no single-page limit truncates the result.
    pub async fn list_distinct(&self, field: &str) -> Result<Vec<String>, AppError> {
        match &self.inner {
            IndexInner::Qdrant(index) => index.list_distinct(field).await,
            IndexInner::Memory(index) => index.list_distinct(field).await,
        }
    }

    /// Reachability probe used by the readiness endpoint.
    pub async fn health(&self) -> Result<(), AppError> {
        match &self.inner {
            IndexInner::Qdrant(index) => index.health().await,
            IndexInner::Memory(_) => Ok(()),
        }
    }
}
