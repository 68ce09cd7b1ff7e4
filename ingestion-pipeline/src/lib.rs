#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod chunker;
pub mod markup;

use std::sync::Arc;

use common::{
    document::Document,
    error::AppError,
    index::{IndexEntry, VectorIndex},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use tracing::info;

pub use chunker::TokenChunker;

/// Outcome of one document ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub file_name: String,
    pub chunk_count: usize,
}

/// Chunk, embed and index one document as a single logical operation: a
/// failure in any stage fails the whole call.
pub struct IngestionPipeline {
    chunker: TokenChunker,
    embedding_provider: Arc<EmbeddingProvider>,
    index: Arc<VectorIndex>,
}

impl IngestionPipeline {
    pub fn new(
        chunker: TokenChunker,
        embedding_provider: Arc<EmbeddingProvider>,
        index: Arc<VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embedding_provider,
            index,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        embedding_provider: Arc<EmbeddingProvider>,
        index: Arc<VectorIndex>,
    ) -> Result<Self, AppError> {
        let chunker = TokenChunker::from_pretrained(
            &config.tokenizer_model,
            config.chunk_size,
            config.chunk_overlap,
        )?;
        Ok(Self::new(chunker, embedding_provider, index))
    }

    pub async fn ingest(&self, document: &Document) -> Result<IngestionReport, AppError> {
        let chunks = self.chunker.process(document);
        if chunks.is_empty() {
            info!(file_name = %document.file_name, "Document produced no chunks, nothing to index");
            return Ok(IngestionReport {
                file_name: document.file_name.clone(),
                chunk_count: 0,
            });
        }

        let embeddings = self.embedding_provider.embed_batch(chunks.clone()).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "embedding count mismatch: {} chunks but {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, vector)| IndexEntry::new(vector, text, document.file_name.clone()))
            .collect();
        let chunk_count = entries.len();

        self.index.upsert(entries).await?;

        info!(
            file_name = %document.file_name,
            chunk_count,
            "Ingested document"
        );
        Ok(IngestionReport {
            file_name: document.file_name.clone(),
            chunk_count,
        })
    }
}
