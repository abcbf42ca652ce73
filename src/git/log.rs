//! Commit history with per-commit change statistics.
//!
//! `git log --format=%aI%n%H%n%an%n%s --shortstat <ref>` prints six lines per
//! commit:
//!
//! ```text
//! 0 author date (strict ISO 8601)
//! 1 commit hash
//! 2 author name
//! 3 subject
//! 4 (blank)
//! 5 shortstat, e.g. " 3 files changed, 10 insertions(+), 2 deletions(-)"
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{Git, Runner, is_hash, output_text};
use crate::error::{AppError, Result};

const RECORD_LINES: usize = 6;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("number pattern is valid"));

/// Change statistics of one commit.
///
/// git leaves out the insertions or deletions clause when its count is zero,
/// so both are tracked as present or absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStat {
    pub changed: u64,
    pub insertions: Option<u64>,
    pub deletions: Option<u64>,
}

impl LogStat {
    pub fn insertions(&self) -> u64 {
        self.insertions.unwrap_or(0)
    }

    pub fn deletions(&self) -> u64 {
        self.deletions.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub hash: String,
    pub author: String,
    pub subject: String,
    pub stat: LogStat,
}

impl<R: Runner> Git<R> {
    /// Commit history of the configured ref, newest first.
    pub async fn log(&self) -> Result<Vec<LogEntry>> {
        let out = self
            .run(&[
                "log",
                "--format=%aI%n%H%n%an%n%s",
                "--shortstat",
                self.git_ref(),
            ])
            .await?;

        parse_log(&out)
    }
}

/// Parse the full output of the log invocation.
///
/// Any malformed record fails the whole listing.
pub fn parse_log(out: &[u8]) -> Result<Vec<LogEntry>> {
    let Some(text) = output_text(out) else {
        return Ok(Vec::new());
    };

    let lines: Vec<&str> = text.split('\n').collect();

    if lines.len() % RECORD_LINES != 0 {
        return Err(AppError::Parse(format!(
            "log: output line count mismatch ({} lines)",
            lines.len()
        )));
    }

    lines.chunks_exact(RECORD_LINES).map(parse_log_entry).collect()
}

fn parse_log_entry(raw: &[&str]) -> Result<LogEntry> {
    let time = DateTime::parse_from_rfc3339(raw[0])
        .map_err(|e| AppError::Parse(format!("log: bad author date {:?}: {}", raw[0], e)))?
        .with_timezone(&Utc);

    if !is_hash(raw[1]) {
        return Err(AppError::Parse(format!("log: bad commit hash {:?}", raw[1])));
    }

    Ok(LogEntry {
        time,
        hash: raw[1].to_string(),
        author: raw[2].to_string(),
        subject: raw[3].to_string(),
        stat: parse_shortstat(raw[5])?,
    })
}

/// Parse a shortstat line.
///
/// The first number is always files changed. The next one belongs to
/// insertions only if the line mentions them, and whatever follows belongs to
/// deletions if those are mentioned.
pub fn parse_shortstat(line: &str) -> Result<LogStat> {
    let nums = NUMBER
        .find_iter(line)
        .map(|m| {
            m.as_str()
                .parse::<u64>()
                .map_err(|e| {
                    AppError::Parse(format!("log: shortstat number {:?}: {}", m.as_str(), e))
                })
        })
        .collect::<Result<Vec<u64>>>()?;

    if nums.is_empty() {
        return Err(AppError::Parse("log: no shortstat numbers found".to_string()));
    }
    if nums.len() < 2 {
        return Err(AppError::Parse(format!("log: weird shortstat numbers: {:?}", line)));
    }

    let missing = || AppError::Parse(format!("log: weird shortstat numbers: {:?}", line));
    let mut rest = nums[1..].iter().copied();

    let insertions = if line.contains("insert") {
        Some(rest.next().ok_or_else(missing)?)
    } else {
        None
    };

    let deletions = if line.contains("delet") {
        Some(rest.next().ok_or_else(missing)?)
    } else {
        None
    };

    Ok(LogStat {
        changed: nums[0],
        insertions,
        deletions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "0123456789abcdef0123456789abcdef01234567";
    const HASH_B: &str = "89abcdef0123456789abcdef0123456789abcdef";

    fn record(date: &str, hash: &str, subject: &str, stat: &str) -> String {
        format!("{date}\n{hash}\nJane Doe\n{subject}\n\n{stat}\n")
    }

    #[test]
    fn shortstat_insertions_only() {
        let stat = parse_shortstat(" 3 files changed, 10 insertions(+)").unwrap();
        assert_eq!(stat.changed, 3);
        assert_eq!(stat.insertions(), 10);
        assert_eq!(stat.deletions(), 0);
        assert_eq!(stat.deletions, None);
    }

    #[test]
    fn shortstat_deletions_only() {
        let stat = parse_shortstat(" 1 file changed, 2 deletions(-)").unwrap();
        assert_eq!(stat.changed, 1);
        assert_eq!(stat.insertions, None);
        assert_eq!(stat.insertions(), 0);
        assert_eq!(stat.deletions(), 2);
    }

    #[test]
    fn shortstat_both_singular() {
        let stat = parse_shortstat(" 5 files changed, 1 insertion(+), 1 deletion(-)").unwrap();
        assert_eq!(
            stat,
            LogStat {
                changed: 5,
                insertions: Some(1),
                deletions: Some(1),
            }
        );
    }

    #[test]
    fn shortstat_needs_two_numbers() {
        assert!(matches!(
            parse_shortstat(" 1 file changed"),
            Err(AppError::Parse(_))
        ));
        assert!(matches!(parse_shortstat(""), Err(AppError::Parse(_))));
    }

    #[test]
    fn shortstat_mentioned_but_missing_number() {
        // "insert" and "delet" both present but only one count after files.
        assert!(parse_shortstat("1 file changed, insertions and 4 deletions").is_err());
    }

    #[test]
    fn parses_records_in_order() {
        let out = format!(
            "{}{}",
            record(
                "2021-03-04T05:06:07+02:00",
                HASH_A,
                "Second",
                " 1 file changed, 2 insertions(+)"
            ),
            record(
                "2021-03-01T00:00:00Z",
                HASH_B,
                "First",
                " 2 files changed, 7 insertions(+), 3 deletions(-)"
            ),
        );

        let entries = parse_log(out.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].hash, HASH_A);
        assert_eq!(entries[0].subject, "Second");
        assert_eq!(entries[0].author, "Jane Doe");
        assert_eq!(
            entries[0].time.to_rfc3339(),
            "2021-03-04T03:06:07+00:00",
            "author date is normalised to UTC"
        );
        assert_eq!(entries[0].stat.insertions(), 2);

        assert_eq!(entries[1].hash, HASH_B);
        assert_eq!(entries[1].stat.changed, 2);
        assert_eq!(entries[1].stat.deletions(), 3);
    }

    #[test]
    fn line_count_mismatch_is_an_error() {
        let mut out = record(
            "2021-03-01T00:00:00Z",
            HASH_A,
            "First",
            " 1 file changed, 1 insertion(+)",
        );
        out.push_str("extra\n");

        let err = parse_log(out.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line count mismatch"));
    }

    #[test]
    fn bad_record_fails_whole_listing() {
        let out = format!(
            "{}{}",
            record(
                "2021-03-01T00:00:00Z",
                HASH_A,
                "Good",
                " 1 file changed, 1 insertion(+)"
            ),
            record("yesterday", HASH_B, "Bad", " 1 file changed, 1 insertion(+)"),
        );
        assert!(matches!(parse_log(out.as_bytes()), Err(AppError::Parse(_))));
    }

    #[test]
    fn malformed_hash_is_rejected() {
        let out = record(
            "2021-03-01T00:00:00Z",
            "not-a-hash",
            "Subject",
            " 1 file changed, 1 insertion(+)",
        );
        assert!(parse_log(out.as_bytes()).is_err());
    }

    #[test]
    fn empty_history() {
        assert!(parse_log(b"").unwrap().is_empty());
        assert!(parse_log(b"\n").unwrap().is_empty());
    }
}
