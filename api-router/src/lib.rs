use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, post},
    Router,
};
use routes::{
    documents::{delete_document, list_documents, upload_documents},
    liveness::live,
    query::{answer_query, answer_query_stream},
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let api = Router::new()
        .route(
            "/documents",
            post(upload_documents)
                .layer(DefaultBodyLimit::max(app_state.config.ingest_max_body_bytes))
                .get(list_documents),
        )
        .route("/documents/{file_name}", delete(delete_document))
        .route("/query", post(answer_query))
        .route("/query/stream", get(answer_query_stream));

    probes.merge(api)
}
