use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::error::Result;
use crate::render::STYLESHEET;
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/style.css", get(get_stylesheet))
        .route("/{repo}", get(get_log))
        .route("/{repo}/files", get(get_files))
        .with_state(state)
}

async fn get_index(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.index)
}

async fn get_stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

async fn get_log(State(state): State<AppState>, Path(repo): Path<String>) -> Result<Html<Bytes>> {
    let page = state.registry.lookup(&repo)?.cached_log().await?;
    Ok(Html(page))
}

async fn get_files(State(state): State<AppState>, Path(repo): Path<String>) -> Result<Html<Bytes>> {
    let page = state.registry.lookup(&repo)?.cached_tree().await?;
    Ok(Html(page))
}
