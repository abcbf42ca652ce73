//! Recursive file listing.
//!
//! `git ls-tree -l -r <ref>` prints one line per path: three space separated
//! columns, then a space padded size column and the path after a tab.
//!
//! ```text
//! 100644 blob e69de29bb2d1d6434b8b29ae775ad8c2e48c5391     1234	README.md
//! ```

use std::fmt;

use super::{Git, Runner, output_text};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Blob => f.write_str("blob"),
            ObjectType::Tree => f.write_str("tree"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Unix file mode bits, e.g. `0o100644`.
    pub mode: u32,
    pub object_type: ObjectType,
    pub hash: String,
    /// Size in bytes, 0 when git reports none.
    pub size: i64,
    pub name: String,
}

impl TreeEntry {
    /// Mode as git prints it.
    pub fn mode_octal(&self) -> String {
        format!("{:06o}", self.mode)
    }
}

impl<R: Runner> Git<R> {
    /// Every tracked path of the configured ref, in git's order.
    pub async fn ls(&self) -> Result<Vec<TreeEntry>> {
        let out = self.run(&["ls-tree", "-l", "-r", self.git_ref()]).await?;
        parse_tree(&out)
    }
}

pub fn parse_tree(out: &[u8]) -> Result<Vec<TreeEntry>> {
    let Some(text) = output_text(out) else {
        return Ok(Vec::new());
    };

    text.split('\n').map(parse_tree_line).collect()
}

pub fn parse_tree_line(line: &str) -> Result<TreeEntry> {
    // mode, type, hash, "size\tname"
    let first: Vec<&str> = line.splitn(4, ' ').collect();
    if first.len() != 4 {
        return Err(AppError::Parse(format!("ls: first split failed: {:?}", line)));
    }

    let (size, name) = first[3]
        .split_once('\t')
        .ok_or_else(|| AppError::Parse(format!("ls: second split failed: {:?}", line)))?;

    let mode = u32::from_str_radix(first[0], 8)
        .map_err(|e| AppError::Parse(format!("ls: bad mode {:?}: {}", first[0], e)))?;

    let object_type = match first[1] {
        "blob" => ObjectType::Blob,
        "tree" => ObjectType::Tree,
        other => {
            return Err(AppError::Parse(format!("ls: unknown object type {:?}", other)));
        }
    };

    let size = size.trim_start_matches(' ');
    let size = if size.starts_with('-') {
        0
    } else {
        size.parse::<i64>()
            .map_err(|e| AppError::Parse(format!("ls: bad size {:?}: {}", size, e)))?
    };

    Ok(TreeEntry {
        mode,
        object_type,
        hash: first[2].to_string(),
        size,
        name: name.to_string(),
    })
}
