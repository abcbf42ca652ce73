use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::render;
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/{repo}/file/{*path}", get(get_file))
        .with_state(state)
}

async fn get_file(
    State(state): State<AppState>,
    Path((repo, path)): Path<(String, String)>,
) -> Result<Html<String>> {
    let repo = state.registry.lookup(&repo)?;
    if repo.config().bare {
        return Err(AppError::BareRepository(repo.name().to_string()));
    }

    let view = repo.fetch_file(&path).await?;
    Ok(Html(render::file_page(repo.config(), &path, &view)))
}
