use std::{pin::Pin, sync::Arc, time::Duration};

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestUserMessage, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use common::{error::AppError, utils::config::AppConfig};
use futures::{Stream, StreamExt};
use tokio::time::timeout;
use tracing::debug;

/// Finite, order-preserving stream of answer fragments. Dropping it drops
/// the underlying response, which closes the connection to the backend.
pub type GenerationStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl GenerationOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.query_model.clone(),
            max_tokens: config.generation_max_tokens,
            temperature: config.generation_temperature,
            timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }
}

/// Chat-completion client for answer generation against an
/// OpenAI-compatible backend.
#[derive(Clone)]
pub struct GenerationClient {
    client: Arc<Client<OpenAIConfig>>,
    options: GenerationOptions,
}

impl GenerationClient {
    pub fn new(client: Arc<Client<OpenAIConfig>>, options: GenerationOptions) -> Self {
        Self { client, options }
    }

    fn build_request(
        &self,
        prompt: &str,
        stream: bool,
    ) -> Result<CreateChatCompletionRequest, AppError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.options.model)
            .messages([ChatCompletionRequestUserMessage::from(prompt).into()])
            .max_tokens(self.options.max_tokens)
            .temperature(self.options.temperature)
            .stream(stream)
            .build()
            .map_err(map_generation_error)
    }

    /// One-shot completion, bounded end-to-end by the configured timeout.
    pub async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let request = self.build_request(prompt, false)?;

        let response = timeout(self.options.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::GenerationTimeout(self.options.timeout.as_secs()))?
            .map_err(map_generation_error)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::GenerationStatus("response contained no message content".to_string())
            })
    }

    /// Streaming completion. The timeout bounds stream establishment; once
    /// fragments flow the stream runs to backend completion or consumer
    /// drop.
    pub async fn stream(&self, prompt: &str) -> Result<GenerationStream, AppError> {
        let request = self.build_request(prompt, true)?;

        let upstream = timeout(
            self.options.timeout,
            self.client.chat().create_stream(request),
        )
        .await
        .map_err(|_| AppError::GenerationTimeout(self.options.timeout.as_secs()))?
        .map_err(map_generation_error)?;

        debug!(model = %self.options.model, "Generation stream established");

        let fragments = upstream
            .map(|item| match item {
                Ok(response) => Ok(response
                    .choices
                    .first()
                    .and_then(|choice| choice.delta.content.clone())
                    .unwrap_or_default()),
                Err(e) => Err(map_generation_error(e)),
            })
            // Role-only and other contentless deltas carry nothing to show.
            .filter(|item| {
                let keep = !matches!(item, Ok(fragment) if fragment.is_empty());
                futures::future::ready(keep)
            })
            .boxed();

        Ok(fragments)
    }
}

fn map_generation_error(err: OpenAIError) -> AppError {
    match err {
        OpenAIError::Reqwest(e) => AppError::GenerationConnection(e.to_string()),
        OpenAIError::StreamError(message) => AppError::GenerationConnection(message),
        OpenAIError::ApiError(e) => AppError::GenerationStatus(e.message),
        OpenAIError::JSONDeserialize(e) => {
            AppError::GenerationStatus(format!("unparseable backend response: {e}"))
        }
        other => AppError::GenerationStatus(other.to_string()),
    }
}
