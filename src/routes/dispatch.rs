use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use validator::Validate;

use crate::error::GatewayError;
use crate::models::{HealthResponse, MessageResponse, QueryRequest, ResultResponse};
use crate::routes::AppState;
use crate::services::{UploadStore, WorkerInput};

/// Multipart field carrying the uploaded document
pub const DOCUMENT_FIELD: &str = "docfile";

/// Configure all worker dispatch routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/rag", web::post().to(run_query))
        .route("/upload-document", web::post().to(upload_document))
        .route("/send-emails", web::post().to(send_emails));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.uploads.is_ready().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Answer a natural-language question about student scores
///
/// POST /api/rag
///
/// Request body:
/// ```json
/// { "query": "Which students scored below 10 in T1a?" }
/// ```
///
/// The query is written to the query worker's stdin and its stdout is
/// returned as `result`.
async fn run_query(
    state: web::Data<AppState>,
    req: web::Json<QueryRequest>,
) -> Result<HttpResponse, GatewayError> {
    if req.validate().is_err() {
        tracing::info!("Rejecting query request without a query");
        return Err(GatewayError::MissingInput("Query not provided".to_string()));
    }

    let QueryRequest { query } = req.into_inner();
    tracing::info!("Running query ({} chars)", query.chars().count());

    let output = state
        .workers
        .query
        .invoke(WorkerInput::Stdin(query))
        .await
        .map_err(|e| {
            tracing::error!("Query worker failed: {}", e);
            GatewayError::worker("Failed to run the query.", e)
        })?;

    Ok(HttpResponse::Ok().json(ResultResponse {
        result: output.stdout,
    }))
}

/// Extract text from an uploaded document
///
/// POST /api/upload-document (multipart, field `docfile`)
///
/// The file is kept in the staging directory and its path is passed to the
/// extraction worker. Files with an unexpected extension are accepted.
async fn upload_document(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, GatewayError> {
    let mut staged: Option<PathBuf> = None;

    if let Err(e) = receive_document(&state.uploads, &mut payload, &mut staged).await {
        if let Some(path) = staged.take() {
            state.uploads.discard(&path).await;
        }
        return Err(e);
    }

    let Some(path) = staged else {
        tracing::error!("No file received in the request.");
        return Err(GatewayError::MissingInput("No file uploaded".to_string()));
    };

    let output = state
        .workers
        .extraction
        .invoke(WorkerInput::Arg(path))
        .await
        .map_err(|e| {
            tracing::error!("Extraction worker failed: {}", e);
            GatewayError::worker("Failed to process the uploaded document.", e)
        })?;

    Ok(HttpResponse::Ok().json(ResultResponse {
        result: output.stdout,
    }))
}

/// Trigger the personalised study-material emails
///
/// POST /api/send-emails (no body)
async fn send_emails(state: web::Data<AppState>) -> Result<HttpResponse, GatewayError> {
    tracing::info!("Received a request to trigger email sending.");

    let output = state
        .workers
        .email
        .invoke(WorkerInput::None)
        .await
        .map_err(|e| {
            tracing::error!("Email worker failed: {}", e);
            GatewayError::worker("Failed to trigger email sending.", e)
        })?;

    tracing::debug!("Email worker output: {}", output.stdout.trim_end());

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Email sent!".to_string(),
    }))
}

/// Read the whole multipart body, staging the first `docfile` file part
///
/// `staged` is set as soon as a file is on disk so the caller can discard it
/// if a later part of the body turns out to be broken.
async fn receive_document(
    uploads: &UploadStore,
    payload: &mut Multipart,
    staged: &mut Option<PathBuf>,
) -> Result<(), GatewayError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            tracing::info!("Malformed multipart upload: {}", e);
            GatewayError::InvalidUpload(e.to_string())
        })?;

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let wanted = staged.is_none() && field.name() == Some(DOCUMENT_FIELD);

        match file_name {
            Some(name) if wanted => {
                tracing::info!("File received: {}", name);
                *staged = Some(stage_field(uploads, &name, &mut field).await?);
            }
            _ => drain_field(&mut field).await?,
        }
    }
    Ok(())
}

/// Stream one multipart field into its own staging directory
///
/// A field that breaks off midway is removed again.
async fn stage_field(
    uploads: &UploadStore,
    file_name: &str,
    field: &mut Field,
) -> Result<PathBuf, GatewayError> {
    if !uploads.has_expected_extension(file_name) {
        tracing::warn!(
            "Accepting {} although it is not a .{} file",
            file_name,
            uploads.document_extension()
        );
    }

    let path = uploads
        .reserve(file_name)
        .await
        .map_err(|e| staging_failed(uploads.dir(), e))?;

    let size = match write_field(&path, field).await {
        Ok(size) => size,
        Err(e) => {
            uploads.discard(&path).await;
            return Err(e);
        }
    };

    tracing::info!("Uploaded file saved at: {} ({} bytes)", path.display(), size);
    Ok(path)
}

async fn write_field(path: &Path, field: &mut Field) -> Result<usize, GatewayError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| staging_failed(path, e))?;

    let mut size = 0usize;
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::info!("Upload stream broke off after {} bytes: {}", size, e);
            GatewayError::InvalidUpload(e.to_string())
        })?;
        size += chunk.len();
        file.write_all(&chunk)
            .await
            .map_err(|e| staging_failed(path, e))?;
    }
    file.flush().await.map_err(|e| staging_failed(path, e))?;
    Ok(size)
}

async fn drain_field(field: &mut Field) -> Result<(), GatewayError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| GatewayError::InvalidUpload(e.to_string()))?;
    }
    Ok(())
}

fn staging_failed(path: &Path, err: std::io::Error) -> GatewayError {
    tracing::error!("Failed to write upload to {}: {}", path.display(), err);
    GatewayError::upload("Failed to store the uploaded document.", err)
}
