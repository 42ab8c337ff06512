//! Reminders source: active reminder lists from the `reminders` CLI

use super::transport::{output_lines, CommandRunner, CommandSourceConfig};
use super::{FetchResult, Section, Source};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const MAX_LINES: usize = 5;

pub struct RemindersSource {
    config: CommandSourceConfig,
    runner: Arc<dyn CommandRunner>,
}

impl RemindersSource {
    pub fn new(config: CommandSourceConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }
}

#[async_trait]
impl Source for RemindersSource {
    fn section(&self) -> Section {
        Section::Reminders
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn fetch(&self) -> FetchResult<String> {
        let stdout = self.runner.run(&self.config.spec()).await?;
        Ok(summarize_reminders(&stdout))
    }
}

/// One reminder list per line, at most five
pub fn summarize_reminders(stdout: &str) -> String {
    output_lines(stdout)
        .take(MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}
