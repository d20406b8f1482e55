use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{
    epaper::{handler_utils::EpaperHeaders, sequencer},
    AppError, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /api/e-paper-image?token=...
///
/// Serves the next image of the client's plan and returns the rest of the
/// plan in the `Token` header.
pub async fn get_epaper_image(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let raw_token = match query {
        Ok(Query(q)) => q.token.unwrap_or_default(),
        Err(e) => {
            // the token is advisory; a bad query string just starts a fresh plan
            tracing::debug!(error = %e, "ignoring unparseable query string");
            String::new()
        }
    };

    // Pin the snapshot for the whole request.
    let snapshot = state.catalog.current();
    if snapshot.is_empty() {
        return Err(AppError::Unavailable);
    }

    let selection = sequencer::select(&snapshot, &raw_token, &mut rand::rng())?;
    let entry = &selection.entry;
    let mut headers = EpaperHeaders::for_entry(entry, &selection.next_token)?;

    let file = File::open(entry.path()).await.map_err(|e| {
        tracing::error!(path = %entry.path().display(), error = %e, "failed to open e-paper image");
        AppError::Io(e)
    })?;
    let on_disk = file
        .metadata()
        .await
        .map_err(|e| {
            tracing::error!(path = %entry.path().display(), error = %e, "failed to stat e-paper image");
            AppError::Io(e)
        })?
        .len();
    if on_disk != entry.size() {
        tracing::warn!(
            name = %entry.name(),
            cataloged = entry.size(),
            on_disk,
            "image changed since catalog scan"
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(on_disk));
    }

    tracing::info!(
        index = selection.index,
        entries = snapshot.len(),
        generation = snapshot.generation(),
        name = %entry.name(),
        "serving e-paper image"
    );

    let name = entry.name().to_string();
    let stream = ReaderStream::new(file).inspect_err(move |e| {
        tracing::error!(%name, error = %e, "error streaming e-paper image");
    });

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

/// GET /healthz
pub async fn health(State(state): State<AppState>) -> Response {
    let snapshot = state.catalog.current();
    if snapshot.is_empty() {
        return AppError::Unavailable.into_response();
    }
    (StatusCode::OK, format!("ok {}", snapshot.len())).into_response()
}
