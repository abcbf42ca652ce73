//! Read-only web viewer for git repositories.
//!
//! Pages are built from the output of the `git` command line tool. The log
//! and file listing of each repository are cached for a configurable time;
//! commits and files are rendered on demand.

pub mod cache;
pub mod config;
pub mod error;
pub mod git;
pub mod registry;
pub mod render;
pub mod routes;
