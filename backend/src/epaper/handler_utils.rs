// handler_utils.rs
use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::catalog::FileEntry;
use super::sequencer::SequenceError;

/// Response header carrying the next token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("token");

// --- HTTP facing error ---
// Details only ever reach the log; clients get a fixed plain-text body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("catalog is empty")]
    Unavailable,
}

impl From<SequenceError> for AppError {
    fn from(e: SequenceError) -> Self {
        match e {
            SequenceError::EmptyCatalog => AppError::Unavailable,
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        match &self {
            AppError::Unavailable => tracing::warn!(error = %self, "request refused"),
            _ => tracing::error!(error = ?self, "request failed"),
        }

        let body = status.canonical_reason().unwrap_or("Error");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        (status, headers, body).into_response()
    }
}

// --- Response headers for a served image ---
pub struct EpaperHeaders;

impl EpaperHeaders {
    pub fn for_entry(entry: &FileEntry, next_token: &str) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );

        let disposition = format!("attachment; filename={}", entry.name());
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition).map_err(|e| {
                anyhow::anyhow!("file name {:?} is not a valid header value: {e}", entry.name())
            })?,
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(entry.size()));
        headers.insert(
            TOKEN_HEADER,
            HeaderValue::from_str(next_token)
                .map_err(|e| anyhow::anyhow!("token is not a valid header value: {e}"))?,
        );
        Ok(headers)
    }
}
