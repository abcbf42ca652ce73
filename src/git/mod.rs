//! Read-only git queries backed by the `git` command line tool.
//!
//! ```text
//! Git<R> --(args)--> Runner --> git --no-pager -c ... -C <path> <args..>
//!   log()    log.rs     6-line records + shortstat
//!   ls()     tree.rs    ls-tree -l -r columns
//!   show()   show.rs    existence / binary checks + content
//!   commit() commit.rs  parent lookup, then 3-way fan-out
//! ```
//!
//! Every query spawns one process per invocation; nothing is retried here.

pub mod commit;
pub mod log;
pub mod show;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::{AppError, Result};

pub use commit::{CommitDetail, EMPTY_TREE, is_hash};
pub use log::{LogEntry, LogStat};
pub use show::FileView;
pub use tree::{ObjectType, TreeEntry};

/// Environment pinned on every invocation so output does not depend on the
/// caller's terminal, locale or pager settings.
const PINNED_ENV: &[(&str, &str)] = &[
    ("GIT_PAGER", "cat"),
    ("PAGER", "cat"),
    ("GIT_TERMINAL_PROMPT", "0"),
    ("TERM", "dumb"),
    ("LC_ALL", "C"),
    ("COLUMNS", "80"),
];

/// Executes one git invocation and returns its stdout.
///
/// Implementations must spawn at most one process per call and must not
/// retry. `GitCommand` is the real one; tests script their own.
pub trait Runner: Clone + Send + Sync + 'static {
    fn run(&self, args: Vec<String>) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Runs the `git` binary inside one repository with a hard deadline.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: Arc<str>,
    path: Arc<Path>,
    timeout: Duration,
}

impl GitCommand {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let path: PathBuf = path.into();
        Self {
            program: Arc::from("git"),
            path: Arc::from(path.as_path()),
            timeout,
        }
    }

    /// Use a different executable, e.g. an absolute path to git.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = Arc::from(program);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&*self.program);
        cmd.arg("--no-pager")
            .args(["-c", "color.ui=never"])
            .args(["-c", "core.quotePath=false"])
            .arg("-C")
            .arg(&*self.path)
            .args(args)
            .envs(PINNED_ENV.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Runner for GitCommand {
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>> {
        let start = Instant::now();
        let joined = args.join(" ");

        // Dropping the output future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, self.command(&args).output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(AppError::Execution {
                    args: joined,
                    status: "spawn failed".to_string(),
                    stderr: e.to_string(),
                });
            }
            Err(_) => {
                tracing::warn!(
                    repo = %self.path.display(),
                    args = %joined,
                    timeout = ?self.timeout,
                    "git command timed out"
                );
                return Err(AppError::Timeout(self.timeout));
            }
        };

        tracing::debug!(
            repo = %self.path.display(),
            args = %joined,
            status = %output.status,
            elapsed = ?start.elapsed(),
            "git command finished"
        );

        if !output.status.success() {
            return Err(AppError::Execution {
                args: joined,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Query facade over a runner, bound to one ref.
#[derive(Debug, Clone)]
pub struct Git<R = GitCommand> {
    runner: R,
    git_ref: String,
}

impl<R: Runner> Git<R> {
    pub fn new(runner: R, git_ref: impl Into<String>) -> Self {
        Self {
            runner,
            git_ref: git_ref.into(),
        }
    }

    /// The branch, tag or revision every query is evaluated against.
    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        self.runner
            .run(args.iter().map(|arg| (*arg).to_string()).collect())
            .await
    }
}

/// Strip exactly one trailing newline and decode lossily.
///
/// Returns `None` for output with no lines at all.
fn output_text(out: &[u8]) -> Option<String> {
    let out = out.strip_suffix(b"\n").unwrap_or(out);
    if out.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(out).into_owned())
    }
}
