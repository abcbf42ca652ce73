//! HTTP route handlers - maps request paths to repository pages.
//!
//! Each submodule defines routes for a page family:
//! - `repository`: index, stylesheet, log and file listing (cached pages)
//! - `commit`: single commit with diff stat and patch
//! - `file`: file contents at the configured ref

pub mod commit;
pub mod file;
pub mod repository;

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::registry::Registry;
use crate::render;

const SECURITY_HEADERS: &[(HeaderName, &str)] = &[
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "deny"),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'none'; style-src 'self'",
    ),
];

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Index page, rendered once since the registry never changes.
    pub index: Bytes,
}

impl AppState {
    pub fn new(registry: Registry) -> Self {
        let index = render::index_page(registry.iter().map(|repo| repo.config()));
        Self {
            registry: Arc::new(registry),
            index: Bytes::from(index),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(repository::routes(state.clone()))
        .merge(commit::routes(state.clone()))
        .merge(file::routes(state));

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            name.clone(),
            HeaderValue::from_static(*value),
        ));
    }

    router
}
