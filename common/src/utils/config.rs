use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Distance function used by the vector collection.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclid,
    Dot,
}

impl SimilarityMetric {
    pub fn as_qdrant_str(self) -> &'static str {
        match self {
            Self::Cosine => "Cosine",
            Self::Euclid => "Euclid",
            Self::Dot => "Dot",
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_tokenizer_model")]
    pub tokenizer_model: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_qdrant_collection")]
    pub qdrant_collection: String,
    #[serde(default)]
    pub similarity_metric: SimilarityMetric,
    #[serde(default = "default_query_model")]
    pub query_model: String,
    #[serde(default = "default_generation_max_tokens")]
    pub generation_max_tokens: u32,
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_ingest_max_body_bytes")]
    pub ingest_max_body_bytes: usize,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_backend() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> u32 {
    384
}

fn default_tokenizer_model() -> String {
    "bert-base-cased".to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_qdrant_collection() -> String {
    "knowledge_base".to_string()
}

fn default_query_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_generation_max_tokens() -> u32 {
    512
}

fn default_generation_temperature() -> f32 {
    0.7
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_retrieval_limit() -> usize {
    2
}

fn default_http_port() -> u16 {
    8000
}

fn default_ingest_max_body_bytes() -> usize {
    10_000_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            embedding_backend: default_embedding_backend(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            tokenizer_model: default_tokenizer_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            qdrant_url: default_qdrant_url(),
            qdrant_collection: default_qdrant_collection(),
            similarity_metric: SimilarityMetric::default(),
            query_model: default_query_model(),
            generation_max_tokens: default_generation_max_tokens(),
            generation_temperature: default_generation_temperature(),
            generation_timeout_secs: default_generation_timeout_secs(),
            retrieval_limit: default_retrieval_limit(),
            http_port: default_http_port(),
            ingest_max_body_bytes: default_ingest_max_body_bytes(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
