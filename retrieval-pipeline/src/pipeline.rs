use std::sync::Arc;
use std::time::Instant;

use common::{
    error::AppError,
    index::{ScoredChunk, VectorIndex},
    utils::embedding::EmbeddingProvider,
};
use tracing::{debug, info};

use crate::generation::{GenerationClient, GenerationStream};
use crate::prompt::{assemble_context, build_prompt};

/// Answers one question per call: embed the question, search the index,
/// assemble the grounded prompt, generate. Stages run strictly in that
/// order and never re-enter.
pub struct QueryPipeline {
    embedding_provider: Arc<EmbeddingProvider>,
    index: Arc<VectorIndex>,
    generation: GenerationClient,
}

impl QueryPipeline {
    pub fn new(
        embedding_provider: Arc<EmbeddingProvider>,
        index: Arc<VectorIndex>,
        generation: GenerationClient,
    ) -> Self {
        Self {
            embedding_provider,
            index,
            generation,
        }
    }

    /// Embeds the question and returns the top-k chunks, best first. An
    /// empty corpus yields an empty vec.
    pub async fn retrieve(
        &self,
        question: &str,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        let embed_started = Instant::now();
        let vector = self.embedding_provider.embed(question).await?;
        let embed_ms = embed_started.elapsed().as_millis();

        let search_started = Instant::now();
        let hits = self.index.search(&vector, limit).await?;
        debug!(
            embed_ms,
            search_ms = search_started.elapsed().as_millis(),
            hit_count = hits.len(),
            "Retrieved context chunks"
        );
        Ok(hits)
    }

    async fn grounded_prompt(&self, question: &str, limit: usize) -> Result<String, AppError> {
        let chunks = self.retrieve(question, limit).await?;
        let context = assemble_context(&chunks);
        Ok(build_prompt(&context, question))
    }

    /// Complete answer in one response.
    pub async fn answer(&self, question: &str, limit: usize) -> Result<String, AppError> {
        let prompt = self.grounded_prompt(question, limit).await?;

        let generate_started = Instant::now();
        let answer = self.generation.complete(&prompt).await?;
        info!(
            generate_ms = generate_started.elapsed().as_millis(),
            "Generated answer"
        );
        Ok(answer)
    }

    /// Answer as a fragment stream. Dropping the stream closes the backend
    /// connection.
    pub async fn answer_stream(
        &self,
        question: &str,
        limit: usize,
    ) -> Result<GenerationStream, AppError> {
        let prompt = self.grounded_prompt(question, limit).await?;
        self.generation.stream(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationOptions;
    use common::document::Document;
    use common::utils::config::SimilarityMetric;
    use ingestion_pipeline::{chunker::fixtures::word_chunker, IngestionPipeline};
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generation_client(base_url: &str, timeout: Duration) -> GenerationClient {
        let client = Arc::new(async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key("test-key")
                .with_api_base(base_url),
        ));
        GenerationClient::new(
            client,
            GenerationOptions {
                model: "test-model".to_string(),
                max_tokens: 64,
                temperature: 0.0,
                timeout,
            },
        )
    }

    fn chat_completion_body(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })
    }

    /// Ingests a two-paragraph document through the real ingestion path so
    /// retrieval sees one indexed chunk per paragraph.
    async fn seeded_pipeline(generation: GenerationClient) -> (QueryPipeline, Arc<VectorIndex>) {
        let provider = Arc::new(EmbeddingProvider::new_hashed(256));
        let index = Arc::new(VectorIndex::memory(SimilarityMetric::Cosine));

        let vocab: Vec<String> = [
            "Paris", "is", "the", "capital", "of", "France", ".", "The", "Euro", "currency",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let ingestion = IngestionPipeline::new(
            word_chunker(&vocab, 500, 50),
            Arc::clone(&provider),
            Arc::clone(&index),
        );

        let text = "Paris is the capital of France.\n\nThe Euro is the currency of France.";
        let document = Document::new("france.txt", text.as_bytes().to_vec());
        let report = ingestion.ingest(&document).await.expect("ingest");
        assert_eq!(report.chunk_count, 2);

        (
            QueryPipeline::new(provider, Arc::clone(&index), generation),
            index,
        )
    }

    #[tokio::test]
    async fn retrieval_ranks_the_capital_paragraph_first() {
        let generation = generation_client("http://127.0.0.1:1/v1", Duration::from_secs(1));
        let (pipeline, _index) = seeded_pipeline(generation).await;

        let hits = pipeline
            .retrieve("What is the capital of France?", 1)
            .await
            .expect("retrieve");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "france.txt");
        assert!(hits[0].text.contains("capital"));
        assert!(!hits[0].text.contains("Euro"));
    }

    #[tokio::test]
    async fn answer_sends_retrieved_context_to_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion_body("Paris.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let generation = generation_client(&server.uri(), Duration::from_secs(5));
        let (pipeline, _index) = seeded_pipeline(generation).await;

        let answer = pipeline
            .answer("What is the capital of France?", 1)
            .await
            .expect("answer");
        assert_eq!(answer, "Paris.");

        let requests = server.received_requests().await.expect("requests");
        assert_eq!(requests.len(), 1);
        let body: Value = requests[0].body_json().expect("json body");
        let content = body["messages"][0]["content"].as_str().expect("content");
        assert!(content.contains("Using the following context"));
        assert!(content.contains("capital of France"));
        assert!(content.contains("Question: What is the capital of France?"));
    }

    #[tokio::test]
    async fn empty_corpus_still_generates_with_blank_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion_body("I do not know.")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = Arc::new(EmbeddingProvider::new_hashed(256));
        let index = Arc::new(VectorIndex::memory(SimilarityMetric::Cosine));
        let pipeline = QueryPipeline::new(
            provider,
            index,
            generation_client(&server.uri(), Duration::from_secs(5)),
        );

        let answer = pipeline
            .answer("What is the capital of France?", 2)
            .await
            .expect("answer");
        assert_eq!(answer, "I do not know.");

        let requests = server.received_requests().await.expect("requests");
        assert_eq!(requests.len(), 1);
        let body: Value = requests[0].body_json().expect("json body");
        let content = body["messages"][0]["content"].as_str().expect("content");
        assert!(content.contains("Context: \n\nQuestion: What is the capital of France?"));
    }

    #[tokio::test]
    async fn unreachable_backend_yields_connection_error() {
        let generation = generation_client("http://127.0.0.1:1/v1", Duration::from_secs(5));
        let (pipeline, _index) = seeded_pipeline(generation).await;

        let err = pipeline
            .answer("What is the capital of France?", 1)
            .await
            .expect_err("unreachable");
        assert!(
            matches!(err, AppError::GenerationConnection(_)),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn slow_backend_yields_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_completion_body("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let generation = generation_client(&server.uri(), Duration::from_millis(100));
        let (pipeline, _index) = seeded_pipeline(generation).await;

        let err = pipeline
            .answer("What is the capital of France?", 1)
            .await
            .expect_err("timeout");
        assert!(matches!(err, AppError::GenerationTimeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn backend_error_status_is_reported_as_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "model 'test-model' not found",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": null
                }
            })))
            .mount(&server)
            .await;

        let generation = generation_client(&server.uri(), Duration::from_secs(5));
        let (pipeline, _index) = seeded_pipeline(generation).await;

        let err = pipeline
            .answer("What is the capital of France?", 1)
            .await
            .expect_err("status");
        assert!(matches!(err, AppError::GenerationStatus(_)), "got {err:?}");
    }
}
