//! Test helpers: a runner that answers from a script instead of spawning git.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Runner;
use crate::error::{AppError, Result};

type Script = dyn Fn(&[String]) -> (Duration, Result<Vec<u8>>) + Send + Sync;

/// Answers each invocation with the script's output after the script's delay
/// and records every argument list it was called with.
#[derive(Clone)]
pub(crate) struct ScriptedRunner {
    script: Arc<Script>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedRunner {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(&[String]) -> (Duration, Result<Vec<u8>>) + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Runner for ScriptedRunner {
    fn run(&self, args: Vec<String>) -> impl Future<Output = Result<Vec<u8>>> + Send {
        self.calls.lock().unwrap().push(args.clone());
        let (delay, result) = (self.script)(&args);
        async move {
            tokio::time::sleep(delay).await;
            result
        }
    }
}

/// A non-zero exit with the given stderr.
pub(crate) fn failure(stderr: &str) -> AppError {
    AppError::Execution {
        args: "scripted".to_string(),
        status: "exit status: 1".to_string(),
        stderr: stderr.to_string(),
    }
}
