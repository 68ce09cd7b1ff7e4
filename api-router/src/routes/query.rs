use std::{pin::Pin, time::Duration};

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Json,
};
use futures::{
    stream::{self, once},
    Stream, StreamExt,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{api_state::ApiState, error::ApiError};

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Synchronous question answering: the full answer in one JSON response.
pub async fn answer_query(
    State(state): State<ApiState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "question must not be empty".to_string(),
        ));
    }

    let limit = request.limit.unwrap_or(state.config.retrieval_limit);
    let answer = state.query.answer(&request.question, limit).await?;
    Ok(Json(json!({ "answer": answer })))
}

fn create_error_stream(message: impl Into<String>) -> EventStream {
    let message = message.into();
    stream::once(async move { Ok(Event::default().event("error").data(message)) }).boxed()
}

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub question: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Streaming question answering over SSE: `answer` events carry fragments
/// in order, `error` carries a diagnostic, and `close_stream` terminates.
/// An abandoned consumer drops the stream, which closes the backend
/// connection.
pub async fn answer_query_stream(
    State(state): State<ApiState>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let events: EventStream = if params.question.trim().is_empty() {
        create_error_stream("question must not be empty")
    } else {
        let limit = params.limit.unwrap_or(state.config.retrieval_limit);
        match state.query.answer_stream(&params.question, limit).await {
            Ok(fragments) => fragments
                .map(|item| match item {
                    Ok(fragment) => Ok(Event::default().event("answer").data(fragment)),
                    Err(e) => Ok(Event::default().event("error").data(e.to_string())),
                })
                .chain(once(async {
                    Ok(Event::default().event("close_stream").data("Stream complete"))
                }))
                .boxed(),
            Err(e) => {
                error!("Failed to establish answer stream: {e}");
                create_error_stream(e.to_string())
            }
        }
    };

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
