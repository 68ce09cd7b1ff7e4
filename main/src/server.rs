use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    index::VectorIndex,
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use ingestion_pipeline::IngestionPipeline;
use retrieval_pipeline::{GenerationClient, GenerationOptions, QueryPipeline};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    // Create embedding provider based on config
    let embedding_provider = Arc::new(EmbeddingProvider::from_config(
        &config,
        Arc::clone(&openai_client),
    )?);
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    // Bootstrap the vector collection. A dimension mismatch with an existing
    // collection aborts startup.
    let index = Arc::new(VectorIndex::qdrant(
        &config.qdrant_url,
        &config.qdrant_collection,
        config.similarity_metric,
    )?);
    index
        .ensure_collection(embedding_provider.dimension())
        .await?;
    info!(
        collection = %config.qdrant_collection,
        backend = index.backend_label(),
        "Vector index ready"
    );

    let ingestion_pipeline = Arc::new(IngestionPipeline::from_config(
        &config,
        Arc::clone(&embedding_provider),
        Arc::clone(&index),
    )?);

    let generation_client = GenerationClient::new(
        Arc::clone(&openai_client),
        GenerationOptions::from_config(&config),
    );
    let query_pipeline = Arc::new(QueryPipeline::new(
        Arc::clone(&embedding_provider),
        Arc::clone(&index),
        generation_client,
    ));

    let api_state = ApiState::new(&config, index, ingestion_pipeline, query_pipeline);

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1::<ApiState>(&api_state))
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::utils::config::{AppConfig, SimilarityMetric};
    use ingestion_pipeline::chunker::fixtures::{numbered_words, word_chunker};
    use std::time::Duration;
    use tower::ServiceExt;

    fn smoke_test_config() -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".into(),
            openai_base_url: "http://127.0.0.1:1/v1".into(),
            embedding_backend: "hashed".into(),
            http_port: 0,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_with_in_memory_index() {
        let config = smoke_test_config();

        let openai_client = Arc::new(async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));

        // Use hashed embeddings and the in-memory index to avoid external
        // dependencies
        let embedding_provider = Arc::new(EmbeddingProvider::new_hashed(64));
        let index = Arc::new(VectorIndex::memory(SimilarityMetric::Cosine));
        index
            .ensure_collection(embedding_provider.dimension())
            .await
            .expect("collection bootstrap");

        let ingestion_pipeline = Arc::new(IngestionPipeline::new(
            word_chunker(&numbered_words(16), config.chunk_size, config.chunk_overlap),
            Arc::clone(&embedding_provider),
            Arc::clone(&index),
        ));
        let query_pipeline = Arc::new(QueryPipeline::new(
            embedding_provider,
            Arc::clone(&index),
            GenerationClient::new(
                openai_client,
                GenerationOptions {
                    model: config.query_model.clone(),
                    max_tokens: config.generation_max_tokens,
                    temperature: config.generation_temperature,
                    timeout: Duration::from_secs(1),
                },
            ),
        ));

        let api_state = ApiState::new(&config, index, ingestion_pipeline, query_pipeline);
        let app = Router::new()
            .nest("/api/v1", api_routes_v1::<ApiState>(&api_state))
            .with_state(api_state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/live")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let ready_response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/ready")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("ready response");
        assert_eq!(ready_response.status(), StatusCode::OK);
    }
}
