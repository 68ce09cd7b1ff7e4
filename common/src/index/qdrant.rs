use std::collections::BTreeSet;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{error::AppError, utils::config::SimilarityMetric};

use super::{IndexEntry, ScoredChunk};

/// Page size used when scrolling the whole collection.
const SCROLL_PAGE_SIZE: usize = 256;

/// Thin client over the Qdrant REST API. The store itself is a black box;
/// only collection bootstrap, point upsert/search/delete and scrolling are
/// used.
#[derive(Clone)]
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    metric: SimilarityMetric,
}

#[derive(Deserialize)]
struct CollectionInfoResponse {
    result: CollectionInfo,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct VectorParams {
    size: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    payload: Option<Value>,
}

impl QdrantIndex {
    pub fn new(
        base_url: &str,
        collection: &str,
        metric: SimilarityMetric,
    ) -> Result<Self, AppError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid vector store url '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "unsupported vector store url scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            metric,
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), AppError> {
        let response = self
            .client
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            info!(
                collection = %self.collection,
                dimension,
                metric = self.metric.as_qdrant_str(),
                "Creating vector collection"
            );
            let create = self
                .client
                .put(self.collection_url(""))
                .json(&json!({
                    "vectors": {
                        "size": dimension,
                        "distance": self.metric.as_qdrant_str(),
                    }
                }))
                .send()
                .await
                .map_err(transport)?;
            error_for_status("collection create", create).await?;
            return Ok(());
        }

        let response = error_for_status("collection info", response).await?;
        let info: CollectionInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::IndexUnavailable(format!("unexpected collection info: {e}")))?;

        let existing = info.result.config.params.vectors.size as usize;
        if existing != dimension {
            return Err(AppError::Config(format!(
                "collection '{}' has dimension {existing} but the embedding provider produces {dimension}",
                self.collection
            )));
        }

        debug!(collection = %self.collection, dimension, "Vector collection present");
        Ok(())
    }

    pub async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), AppError> {
        if entries.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": entries }))
            .send()
            .await
            .map_err(transport)?;
        error_for_status("point upsert", response).await?;
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

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(transport)?;
        let response = error_for_status("point search", response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::IndexUnavailable(format!("unexpected search response: {e}")))?;

        let hits = parsed
            .result
            .into_iter()
            .filter_map(|hit| {
                let payload = hit.payload?;
                let text = payload.get("text")?.as_str()?.to_owned();
                let file_name = payload
                    .get("file_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                Some(ScoredChunk {
                    text,
                    file_name,
                    score: hit.score,
                })
            })
            .collect();
        Ok(hits)
    }

    pub async fn delete_by_filter(&self, field: &str, value: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.collection_url("/points/delete?wait=true"))
            .json(&json!({
                "filter": {
                    "must": [{ "key": field, "match": { "value": value } }]
                }
            }))
            .send()
            .await
            .map_err(transport)?;
        error_for_status("point delete", response).await?;
        Ok(())
    }

    pub async fn list_distinct(&self, field: &str) -> Result<Vec<String>, AppError> {
        let mut values = BTreeSet::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": true,
                "with_vector": false,
            });
            if let (Some(cursor), Some(map)) = (offset.take(), body.as_object_mut()) {
                map.insert("offset".to_string(), cursor);
            }

            let response = self
                .client
                .post(self.collection_url("/points/scroll"))
                .json(&body)
                .send()
                .await
                .map_err(transport)?;
            let response = error_for_status("point scroll", response).await?;

            let parsed: ScrollResponse = response.json().await.map_err(|e| {
                AppError::IndexUnavailable(format!("unexpected scroll response: {e}"))
            })?;

            for point in parsed.result.points {
                let Some(payload) = point.payload else {
                    continue;
                };
                match payload.get(field).and_then(Value::as_str) {
                    Some(value) => {
                        values.insert(value.to_owned());
                    }
                    None => warn!(field, "Scrolled point payload missing field"),
                }
            }

            match parsed.result.next_page_offset {
                Some(cursor) if !cursor.is_null() => offset = Some(cursor),
                _ => break,
            }
        }

        Ok(values.into_iter().collect())
    }

    pub async fn health(&self) -> Result<(), AppError> {
        let response = self
            .client
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(transport)?;
        error_for_status("collection probe", response).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> AppError {
    AppError::IndexUnavailable(err.to_string())
}

async fn error_for_status(
    context: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::IndexUnavailable(format!(
        "{context} failed with status {status}: {body}"
    )))
}
