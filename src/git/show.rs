//! File contents at the configured ref.

use super::{Git, Runner};
use crate::error::{AppError, Result};

/// Contents of one tracked file. Binary files carry no content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileView {
    pub binary: bool,
    pub content: Option<Vec<u8>>,
}

impl<R: Runner> Git<R> {
    /// Contents of `path` at the configured ref, or `NotExist`.
    pub async fn show(&self, path: &str) -> Result<FileView> {
        if path.is_empty() || !self.exists(path).await? {
            return Err(AppError::NotExist(path.to_string()));
        }

        if self.binary(path).await? {
            return Ok(FileView {
                binary: true,
                content: None,
            });
        }

        let object = format!("{}:{}", self.git_ref(), path);
        let content = self.run(&["show", object.as_str()]).await?;

        Ok(FileView {
            binary: false,
            content: Some(content),
        })
    }

    /// `cat-file -e` exits non-zero for unknown objects. Timeouts still
    /// propagate.
    async fn exists(&self, path: &str) -> Result<bool> {
        let object = format!("{}:{}", self.git_ref(), path);
        match self.run(&["cat-file", "-e", object.as_str()]).await {
            Ok(out) => Ok(out.is_empty()),
            Err(AppError::Execution { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// A file is text when `grep -I` finds at least one printable line in it.
    /// Empty files count as binary.
    async fn binary(&self, path: &str) -> Result<bool> {
        let pathspec = format!(":(literal){}", path);
        match self
            .run(&[
                "grep",
                "-I",
                "--name-only",
                "-e",
                ".",
                self.git_ref(),
                "--",
                pathspec.as_str(),
            ])
            .await
        {
            Ok(out) => Ok(out.is_empty()),
            Err(AppError::Execution { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }
}
