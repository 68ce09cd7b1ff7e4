use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use common::{document::Document, error::AppError};
use futures::future::try_join_all;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "10000000")]
    #[form_data(default)]
    pub files: Vec<FieldData<Bytes>>,
}

/// Multipart upload: every file is chunked, embedded and indexed. The
/// response carries per-file chunk counts.
pub async fn upload_documents(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    if input.files.is_empty() {
        return Err(ApiError::ValidationError(
            "no files provided in the upload".to_string(),
        ));
    }

    info!(file_count = input.files.len(), "Received document upload");

    let documents = input
        .files
        .into_iter()
        .map(|file| {
            let file_name = file.metadata.file_name.clone().ok_or_else(|| {
                AppError::Validation("uploaded file is missing a file name".to_string())
            })?;
            Ok(Document::new(file_name, file.contents.to_vec()))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let reports = try_join_all(
        documents
            .iter()
            .map(|document| state.ingestion.ingest(document)),
    )
    .await?;

    let ingested: Vec<_> = reports
        .iter()
        .map(|report| {
            json!({
                "file_name": report.file_name,
                "chunk_count": report.chunk_count,
            })
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({ "status": "success", "documents": ingested })),
    ))
}

/// Distinct file names currently present in the index, sorted.
pub async fn list_documents(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.index.list_distinct("file_name").await?;
    Ok(Json(json!({ "documents": documents })))
}

/// Removes every chunk indexed under the given file name. Deleting an
/// unknown name succeeds as a no-op.
pub async fn delete_document(
    State(state): State<ApiState>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.index.delete_by_filter("file_name", &file_name).await?;
    info!(%file_name, "Deleted document from index");
    Ok(Json(json!({ "status": "success" })))
}
