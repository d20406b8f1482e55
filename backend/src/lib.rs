// lib.rs

use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod epaper;

use epaper::catalog::Catalog;
use epaper::handler_utils::TOKEN_HEADER;
use epaper::image_handlers::{get_epaper_image, health};

pub use epaper::handler_utils::AppError;

// --- Application State ---
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

pub fn app(state: AppState) -> Router {
    // Browsers only let scripts read the token if it is exposed.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .expose_headers([TOKEN_HEADER]);

    Router::new()
        .route("/api/e-paper-image", get(get_epaper_image))
        .route("/healthz", get(health))
        .layer(cors)
        .with_state(state)
}
