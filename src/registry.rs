//! Repository table built once from the configuration file.
//!
//! The registry is immutable after construction and shared behind an `Arc`,
//! so lookups need no locking. Each `Repository` carries its own git runner
//! and its own page cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;

use crate::cache::{CacheKind, TtlCache};
use crate::config::{Config, RepoEntry, duration_or};
use crate::error::{AppError, Result};
use crate::git::{CommitDetail, FileView, Git, GitCommand, LogEntry, Runner, TreeEntry};
use crate::render;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_REF: &str = "HEAD";

const BARE_SUFFIX: &str = ".git";

/// Validated settings of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Public name used in URLs.
    pub name: String,
    pub path: PathBuf,
    pub git_ref: String,
    pub bare: bool,
    pub description: Vec<String>,
    pub timeout: Duration,
    pub cache_duration: Duration,
}

impl RepositoryConfig {
    pub fn from_entry(entry: &RepoEntry) -> Result<Self> {
        let timeout = duration_or(&entry.timeout, DEFAULT_TIMEOUT)?;
        if timeout.is_zero() {
            return Err(AppError::Config(format!(
                "{}: timeout must be greater than zero",
                entry.path.display()
            )));
        }

        let git_ref = if entry.git_ref.is_empty() {
            DEFAULT_REF.to_string()
        } else {
            entry.git_ref.clone()
        };

        Ok(Self {
            name: public_name(&entry.path, entry.bare)?,
            path: entry.path.clone(),
            git_ref,
            bare: entry.bare,
            description: entry.description.clone(),
            timeout,
            cache_duration: duration_or(&entry.cache_duration, DEFAULT_CACHE_DURATION)?,
        })
    }
}

/// Last path segment, without `.git` for bare repositories.
pub fn public_name(path: &Path, bare: bool) -> Result<String> {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Config(format!("{}: path has no final segment", path.display())))?;

    let name = if bare {
        base.strip_suffix(BARE_SUFFIX).unwrap_or(&base).to_string()
    } else {
        base
    };

    if name.is_empty() || name.contains('/') {
        return Err(AppError::Config(format!(
            "{}: cannot derive a repository name",
            path.display()
        )));
    }

    Ok(name)
}

/// One served repository: settings, git access and page cache.
pub struct Repository<R = GitCommand> {
    config: RepositoryConfig,
    git: Git<R>,
    cache: TtlCache,
}

impl Repository<GitCommand> {
    pub fn new(config: RepositoryConfig) -> Self {
        let runner = GitCommand::new(&config.path, config.timeout);
        Self::with_runner(config, runner)
    }
}

impl<R: Runner> Repository<R> {
    pub fn with_runner(config: RepositoryConfig, runner: R) -> Self {
        let git = Git::new(runner, config.git_ref.clone());
        // A recompute is bounded by the command timeout, so waiting on
        // someone else's recompute gets the same bound.
        let cache = TtlCache::new(config.cache_duration, config.timeout);
        Self { config, git, cache }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn git(&self) -> &Git<R> {
        &self.git
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub async fn fetch_log(&self) -> Result<Vec<LogEntry>> {
        self.git.log().await
    }

    pub async fn fetch_tree(&self) -> Result<Vec<TreeEntry>> {
        self.git.ls().await
    }

    pub async fn fetch_commit(&self, hash: &str) -> Result<CommitDetail> {
        self.git.commit(hash).await
    }

    pub async fn fetch_file(&self, path: &str) -> Result<FileView> {
        self.git.show(path).await
    }

    /// Rendered log page, served from the cache while fresh.
    pub async fn cached_log(&self) -> Result<Bytes> {
        self.cache
            .get_or_compute(CacheKind::Log, || async {
                let entries = self.fetch_log().await?;
                Ok::<_, AppError>(Bytes::from(render::log_page(&self.config, &entries)))
            })
            .await
    }

    /// Rendered file listing page, served from the cache while fresh.
    pub async fn cached_tree(&self) -> Result<Bytes> {
        self.cache
            .get_or_compute(CacheKind::Tree, || async {
                let entries = self.fetch_tree().await?;
                Ok::<_, AppError>(Bytes::from(render::tree_page(&self.config, &entries)))
            })
            .await
    }
}

/// Name-indexed table of every configured repository.
#[derive(Default)]
pub struct Registry {
    repos: BTreeMap<String, Arc<Repository>>,
}

impl Registry {
    pub fn from_config(config: &Config) -> Result<Self> {
        let repos = config
            .repos
            .iter()
            .map(|entry| RepositoryConfig::from_entry(entry).map(Repository::new))
            .collect::<Result<Vec<_>>>()?;

        Self::from_repositories(repos)
    }

    pub fn from_repositories(repos: impl IntoIterator<Item = Repository>) -> Result<Self> {
        let mut table = BTreeMap::new();

        for repo in repos {
            let name = repo.name().to_string();
            if table.contains_key(&name) {
                return Err(AppError::Config(format!(
                    "two repositories are named {:?}",
                    name
                )));
            }

            tracing::debug!(
                name = %name,
                path = %repo.config().path.display(),
                git_ref = %repo.config().git_ref,
                timeout = ?repo.config().timeout,
                cache = ?repo.config().cache_duration,
                "registered repository"
            );
            table.insert(name, Arc::new(repo));
        }

        Ok(Self { repos: table })
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Repository>> {
        self.repos
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::RepoNotFound(name.to_string()))
    }

    /// Repositories ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Repository>> {
        self.repos.values()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}
