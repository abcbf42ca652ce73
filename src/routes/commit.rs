use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Router,
};

use crate::error::Result;
use crate::render;
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/{repo}/commit/{hash}", get(get_commit))
        .with_state(state)
}

async fn get_commit(
    State(state): State<AppState>,
    Path((repo, hash)): Path<(String, String)>,
) -> Result<Html<String>> {
    let repo = state.registry.lookup(&repo)?;
    let detail = repo.fetch_commit(&hash).await?;
    Ok(Html(render::commit_page(repo.config(), &hash, &detail)))
}
