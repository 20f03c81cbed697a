use crate::models::ErrorResponse;
use crate::services::WorkerError;
use actix_web::{error, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Errors returned by the gateway routes
///
/// The client only ever sees `message`, which is deliberately generic;
/// the underlying cause is kept as the error source for logging.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    MissingInput(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("{message}")]
    Worker {
        message: String,
        #[source]
        source: WorkerError,
    },

    #[error("{message}")]
    Upload {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    pub fn worker(message: impl Into<String>, source: WorkerError) -> Self {
        Self::Worker {
            message: message.into(),
            source,
        }
    }

    pub fn upload(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Upload {
            message: message.into(),
            source,
        }
    }

    /// Machine-readable kind placed in the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "missing_input",
            Self::InvalidJson(_) => "invalid_json",
            Self::InvalidUpload(_) => "invalid_upload",
            Self::Worker { source, .. } => match source {
                WorkerError::Spawn { .. } => "worker_unavailable",
                WorkerError::Timeout { .. } => "worker_timeout",
                WorkerError::NonZeroExit { .. } | WorkerError::Wait { .. } => "worker_failed",
            },
            Self::Upload { .. } => "upload_failed",
        }
    }
}

impl error::ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingInput(_) | Self::InvalidJson(_) | Self::InvalidUpload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Worker { .. } | Self::Upload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    GatewayError::InvalidJson(err.to_string()).into()
}
