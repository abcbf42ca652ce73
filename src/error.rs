//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure the git layer, cache and registry can
//! produce, and implements Axum's `IntoResponse` so handlers can return them
//! directly.
//!
//! Error mappings:
//! - `InvalidHash`, `NotExist` → 400
//! - `RepoNotFound`, `BareRepository` → 404
//! - `Timeout` → 408
//! - `Execution`, `Parse`, `Internal`, `Config`, `Io` → 500 (logged)

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Commit identifier is not 40 alphanumeric characters. Raised before any
    /// process is spawned.
    #[error("git: commit: not a hash")]
    InvalidHash,

    #[error("git: show: file does not exist: {0}")]
    NotExist(String),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Cannot view files of bare repository: {0}")]
    BareRepository(String),

    #[error("git: command timed out after {0:?}")]
    Timeout(Duration),

    #[error("git {args}: {status}: {stderr}")]
    Execution {
        args: String,
        status: String,
        stderr: String,
    },

    #[error("git: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidHash | AppError::NotExist(_) => StatusCode::BAD_REQUEST,
            AppError::RepoNotFound(_) | AppError::BareRepository(_) => StatusCode::NOT_FOUND,
            AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Execution { .. }
            | AppError::Parse(_)
            | AppError::Internal(_)
            | AppError::Config(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!("{}", self),
            StatusCode::REQUEST_TIMEOUT => tracing::warn!("{}", self),
            _ => tracing::debug!("{}", self),
        }

        // Internal details stay in the log, the client only sees the reason phrase.
        let body = status.canonical_reason().unwrap_or("Error");

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
