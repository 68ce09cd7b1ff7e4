use std::sync::Arc;

use common::{index::VectorIndex, utils::config::AppConfig};
use ingestion_pipeline::IngestionPipeline;
use retrieval_pipeline::QueryPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub index: Arc<VectorIndex>,
    pub ingestion: Arc<IngestionPipeline>,
    pub query: Arc<QueryPipeline>,
}

impl ApiState {
    pub fn new(
        config: &AppConfig,
        index: Arc<VectorIndex>,
        ingestion: Arc<IngestionPipeline>,
        query: Arc<QueryPipeline>,
    ) -> Self {
        Self {
            config: config.clone(),
            index,
            ingestion,
            query,
        }
    }
}
