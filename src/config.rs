//! Server configuration file.
//!
//! ```json
//! {
//!   "listen": "127.0.0.1:8080",
//!   "repos": [
//!     { "path": "/srv/git/site.git", "bare": true, "ref": "main",
//!       "description": ["Personal website"], "timeout": "2s", "cache_duration": "1h" }
//!   ]
//! }
//! ```
//!
//! Durations use the `1h30m` / `250ms` / `1.5s` syntax. Empty strings select
//! the defaults applied by the registry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Result};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
}

/// One repository as written in the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub bare: bool,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub timeout: String,
    #[serde(default)]
    pub cache_duration: String,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| AppError::Config(e.to_string()))
    }
}

/// `parse_duration` for non-empty input, `default` otherwise.
pub fn duration_or(input: &str, default: Duration) -> Result<Duration> {
    if input.is_empty() {
        Ok(default)
    } else {
        parse_duration(input)
    }
}

/// Parse a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`. A bare `0` is allowed;
/// any other number needs a unit. Negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || AppError::Config(format!("invalid duration {:?}", input));

    let mut s = input.strip_prefix('+').unwrap_or(input);
    if s.starts_with('-') {
        return Err(AppError::Config(format!("negative duration {:?}", input)));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut nanos: u128 = 0;
    while !s.is_empty() {
        let number_end = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(invalid)?;
        let (number, rest) = s.split_at(number_end);

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let (unit, tail) = rest.split_at(unit_end);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return Err(invalid()),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        // Digits past nanosecond precision of an hour cannot matter.
        let fraction = &fraction[..fraction.len().min(18)];
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let digits: u128 = fraction.parse().map_err(|_| invalid())?;
            digits * scale / 10u128.pow(fraction.len() as u32)
        };

        nanos = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(fraction_nanos))
            .and_then(|n| n.checked_add(nanos))
            .ok_or_else(invalid)?;
        s = tail;
    }

    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .map_err(|_| invalid())
}
