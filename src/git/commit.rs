//! Commit detail: object dump, diffstat and full diff.
//!
//! ```text
//! is_hash(hash)?                      no process before this passes
//! rev-list --parents -n 1 <hash>      picks <base>: <hash>~ or EMPTY_TREE
//!   ├─ cat-file -p <hash>       ┐
//!   ├─ diff --stat <base> <hash> ├─ JoinSet, all joined, first error wins
//!   └─ diff <base> <hash>       ┘
//! ```

use tokio::task::JoinSet;

use super::{Git, Runner};
use crate::error::{AppError, Result};

/// Tree object with no entries. Root commits are diffed against it.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

const HASH_LEN: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDetail {
    pub cat_file: Vec<u8>,
    pub diff_stat: Vec<u8>,
    pub diff: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
enum Part {
    CatFile,
    DiffStat,
    Diff,
}

impl CommitDetail {
    fn fill(&mut self, part: Part, out: Vec<u8>) {
        match part {
            Part::CatFile => self.cat_file = out,
            Part::DiffStat => self.diff_stat = out,
            Part::Diff => self.diff = out,
        }
    }
}

/// Exactly 40 characters from `[0-9A-Za-z]`.
pub fn is_hash(s: &str) -> bool {
    s.len() == HASH_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl<R: Runner> Git<R> {
    pub async fn commit(&self, hash: &str) -> Result<CommitDetail> {
        if !is_hash(hash) {
            return Err(AppError::InvalidHash);
        }

        let base = if self.has_parents(hash).await? {
            format!("{}~", hash)
        } else {
            EMPTY_TREE.to_string()
        };

        let jobs = [
            (Part::CatFile, vec!["cat-file", "-p", hash]),
            (Part::DiffStat, vec!["diff", "--stat", base.as_str(), hash]),
            (Part::Diff, vec!["diff", base.as_str(), hash]),
        ];

        let mut tasks = JoinSet::new();
        for (part, args) in jobs {
            let runner = self.runner.clone();
            let args: Vec<String> = args.into_iter().map(str::to_string).collect();
            tasks.spawn(async move { (part, runner.run(args).await) });
        }

        let mut detail = CommitDetail::default();
        let mut first_err = None;

        // Wait for every task even after a failure; errors keep completion order.
        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok((part, Ok(out))) => {
                    detail.fill(part, out);
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(e) => AppError::Internal(format!("commit task failed: {}", e)),
            };

            if first_err.is_none() {
                first_err = Some(err);
            } else {
                tracing::debug!(error = %err, "additional commit query failure");
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(detail),
        }
    }

    /// A root commit prints only its own hash; anything after a space is a
    /// parent. A failed lookup counts as "no parents".
    async fn has_parents(&self, hash: &str) -> Result<bool> {
        match self.run(&["rev-list", "--parents", "-n", "1", hash]).await {
            Ok(out) => Ok(out.contains(&b' ')),
            Err(AppError::Execution { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
