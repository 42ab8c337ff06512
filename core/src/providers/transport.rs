//! Network and process collaborators used by the sources
//!
//! Both are traits so the sources can be driven by in-memory fakes in tests.
//! Neither applies a timeout: the caller's deadline scope drops the future,
//! and dropping it aborts the request or kills the child.

use super::{FetchError, FetchResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// `GET url -> body`
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> FetchResult<String>;
}

/// HTTP client backed by reqwest
pub struct ReqwestHttpClient {
    http_client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(user_agent: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http_client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> FetchResult<String> {
        debug!(target = "http", url = %url, "GET");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

/// A local program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Directories appended to the inherited PATH
    pub extra_path: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            extra_path: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// `run(command, env) -> stdout`
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> FetchResult<String>;
}

/// Runs programs with `tokio::process`; the child is killed if the future is dropped
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> FetchResult<String> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if !spec.extra_path.is_empty() {
            let inherited = std::env::var_os("PATH").unwrap_or_default();
            let dirs = std::env::split_paths(&inherited)
                .chain(spec.extra_path.iter().map(std::path::PathBuf::from));
            if let Ok(path) = std::env::join_paths(dirs) {
                cmd.env("PATH", path);
            }
        }

        debug!(target = "process", program = %spec.program, args = ?spec.args, "Running command");
        let output = cmd.output().await.map_err(|e| FetchError::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(FetchError::NonZeroExit {
                program: spec.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Settings for a source backed by a local command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSourceConfig {
    pub program: String,
    pub args: Vec<String>,
    pub extra_path: Vec<String>,
    pub timeout_ms: u64,
}

impl CommandSourceConfig {
    /// Today's and upcoming events via icalBuddy
    pub fn calendar() -> Self {
        Self {
            program: "icalBuddy".to_string(),
            args: ["-n", "-nc", "-iep", "title,datetime", "-b", "", "eventsToday+2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_path: Vec::new(),
            timeout_ms: 5_000,
        }
    }

    /// Reminder lists via the `reminders` CLI
    pub fn reminders() -> Self {
        Self {
            program: "reminders".to_string(),
            args: vec!["show-lists".to_string()],
            extra_path: Vec::new(),
            timeout_ms: 5_000,
        }
    }

    /// Numbered headline digest printed by `youtube-news`
    pub fn news() -> Self {
        Self {
            program: "youtube-news".to_string(),
            args: Vec::new(),
            extra_path: vec!["/usr/local/bin".to_string(), "/opt/homebrew/bin".to_string()],
            timeout_ms: 15_000,
        }
    }

    pub fn spec(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(self.program.clone()).args(self.args.iter().cloned());
        spec.extra_path = self.extra_path.clone();
        spec
    }
}

/// Non-empty trimmed lines of command output
pub(crate) fn output_lines(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.lines().map(str::trim).filter(|l| !l.is_empty())
}
