use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::languages;
use crate::state::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/", get(read_root))
        // Documentation
        .route("/docs", get(api_docs))
        .route("/languages", get(list_languages))
        .route("/translate", post(handlers::translate_audio))
}

/// Full application router with its middleware stack.
pub fn create_app(state: AppState) -> Router {
    let upload_limit = state.settings.max_upload_bytes;

    Router::new()
        .merge(create_routes())
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn read_root() -> Json<Value> {
    Json(json!({"message": "Hello World"}))
}

async fn api_docs() -> String {
    format!(
        "Audio Translation API\n\n\
         API for translating audio files using Google Gemini.\n\n\
         GET /\n\nLiveness check.\n\n\
         GET /languages\n\nSupported target languages as JSON.\n\n{}",
        handlers::translate_description()
    )
}

async fn list_languages() -> Json<Value> {
    let languages: Vec<Value> = languages::list_entries()
        .map(|(code, name)| json!({"code": code, "name": name}))
        .collect();
    Json(json!({ "languages": languages }))
}
