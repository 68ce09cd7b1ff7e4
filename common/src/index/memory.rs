use std::{cmp::Ordering, collections::BTreeSet, collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{error::AppError, utils::config::SimilarityMetric};

use super::{ChunkPayload, IndexEntry, ScoredChunk};

/// In-process vector index with the same observable semantics as the Qdrant
/// backend: overwrite-by-id upsert, top-k search, filter delete, scroll-free
/// distinct listing.
#[derive(Clone)]
pub struct MemoryIndex {
    metric: SimilarityMetric,
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    dimension: Option<usize>,
    points: HashMap<String, (Vec<f32>, ChunkPayload)>,
}

impl MemoryIndex {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            metric,
            state: Arc::new(RwLock::new(MemoryState::default())),
        }
    }

    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        match state.dimension {
            None => {
                state.dimension = Some(dimension);
                Ok(())
            }
            Some(existing) if existing == dimension => Ok(()),
            Some(existing) => Err(AppError::Config(format!(
                "collection dimension {existing} does not match embedding dimension {dimension}"
            ))),
        }
    }

    pub async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        for entry in entries {
            state.points.insert(entry.id, (entry.vector, entry.payload));
        }
        Ok(())
    }

    pub async fn search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        let mut hits: Vec<ScoredChunk> = state
            .points
            .values()
            .map(|(candidate, payload)| ScoredChunk {
                text: payload.text.clone(),
                file_name: payload.file_name.clone(),
                score: score(self.metric, vector, candidate),
            })
            .collect();

        // Qdrant orders euclid results ascending (distance), the rest
        // descending (similarity).
        match self.metric {
            SimilarityMetric::Euclid => {
                hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
            }
            SimilarityMetric::Cosine | SimilarityMetric::Dot => {
                hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            }
        }
        hits.truncate(limit);
        Ok(hits)
    }

    pub async fn delete_by_filter(&self, field: &str, value: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state
            .points
            .retain(|_, (_, payload)| payload.field(field) != Some(value));
        Ok(())
    }

    pub async fn list_distinct(&self, field: &str) -> Result<Vec<String>, AppError> {
        let state = self.state.read().await;
        let values: BTreeSet<String> = state
            .points
            .values()
            .filter_map(|(_, payload)| payload.field(field).map(str::to_owned))
            .collect();
        Ok(values.into_iter().collect())
    }
}

fn score(metric: SimilarityMetric, query: &[f32], candidate: &[f32]) -> f32 {
    match metric {
        SimilarityMetric::Cosine => cosine(query, candidate),
        SimilarityMetric::Dot => dot(query, candidate),
        SimilarityMetric::Euclid => query
            .iter()
            .zip(candidate)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt(),
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, vector: Vec<f32>, text: &str, file_name: &str) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            payload: ChunkPayload {
                text: text.to_string(),
                file_name: file_name.to_string(),
            },
        }
    }

    fn cosine_index() -> MemoryIndex {
        MemoryIndex::new(SimilarityMetric::Cosine)
    }

    #[tokio::test]
    async fn search_returns_descending_similarity() {
        let index = cosine_index();
        index
            .upsert(vec![
                entry("a", vec![1.0, 0.0], "exact", "a.txt"),
                entry("b", vec![0.7, 0.7], "diagonal", "b.txt"),
                entry("c", vec![0.0, 1.0], "orthogonal", "c.txt"),
            ])
            .await
            .expect("upsert");

        let hits = index.search(&[1.0, 0.0], 3).await.expect("search");
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "diagonal", "orthogonal"]);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score > hits[2].score);
    }

    #[tokio::test]
    async fn search_on_empty_corpus_returns_empty() {
        let index = cosine_index();
        let hits = index.search(&[1.0, 0.0], 5).await.expect("search");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_returns_fewer_than_limit_when_corpus_is_small() {
        let index = cosine_index();
        index
            .upsert(vec![entry("a", vec![1.0, 0.0], "only", "a.txt")])
            .await
            .expect("upsert");

        let hits = index.search(&[1.0, 0.0], 10).await.expect("search");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let index = cosine_index();
        index
            .upsert(vec![entry("a", vec![1.0, 0.0], "old", "a.txt")])
            .await
            .expect("upsert");
        index
            .upsert(vec![entry("a", vec![1.0, 0.0], "new", "a.txt")])
            .await
            .expect("upsert");

        let hits = index.search(&[1.0, 0.0], 10).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new");
    }

    #[tokio::test]
    async fn delete_by_filter_removes_only_matches() {
        let index = cosine_index();
        index
            .upsert(vec![
                entry("a", vec![1.0, 0.0], "first", "keep.txt"),
                entry("b", vec![0.0, 1.0], "second", "drop.txt"),
                entry("c", vec![0.5, 0.5], "third", "drop.txt"),
            ])
            .await
            .expect("upsert");

        index
            .delete_by_filter("file_name", "drop.txt")
            .await
            .expect("delete");

        let hits = index.search(&[1.0, 0.0], 10).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "keep.txt");
    }

    #[tokio::test]
    async fn delete_by_filter_with_no_match_is_noop() {
        let index = cosine_index();
        index
            .upsert(vec![entry("a", vec![1.0, 0.0], "first", "keep.txt")])
            .await
            .expect("upsert");

        index
            .delete_by_filter("file_name", "absent.txt")
            .await
            .expect("delete");

        let hits = index.search(&[1.0, 0.0], 10).await.expect("search");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn list_distinct_deduplicates_and_sorts() {
        let index = cosine_index();
        index
            .upsert(vec![
                entry("a", vec![1.0, 0.0], "one", "b.txt"),
                entry("b", vec![0.0, 1.0], "two", "a.txt"),
                entry("c", vec![0.5, 0.5], "three", "b.txt"),
            ])
            .await
            .expect("upsert");

        let names = index.list_distinct("file_name").await.expect("list");
        assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test]
    async fn ensure_collection_rejects_dimension_mismatch() {
        let index = cosine_index();
        index.ensure_collection(384).await.expect("first");
        index.ensure_collection(384).await.expect("idempotent");
        let err = index.ensure_collection(512).await.expect_err("mismatch");
        assert!(matches!(err, AppError::Config(_)));
    }
}
