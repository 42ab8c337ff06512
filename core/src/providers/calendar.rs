//! Calendar source: today's and upcoming events from icalBuddy

use super::transport::{output_lines, CommandRunner, CommandSourceConfig};
use super::{FetchResult, Section, Source};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Events read out
const MAX_EVENTS: usize = 3;

pub struct CalendarSource {
    config: CommandSourceConfig,
    runner: Arc<dyn CommandRunner>,
}

impl CalendarSource {
    pub fn new(config: CommandSourceConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }
}

#[async_trait]
impl Source for CalendarSource {
    fn section(&self) -> Section {
        Section::Calendar
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn fetch(&self) -> FetchResult<String> {
        let stdout = self.runner.run(&self.config.spec()).await?;
        Ok(summarize_events(&stdout))
    }
}

/// First few distinct events, comma separated. Empty when there are none.
pub fn summarize_events(stdout: &str) -> String {
    let mut events: Vec<&str> = Vec::new();
    for line in output_lines(stdout).take(MAX_EVENTS) {
        if !events.contains(&line) {
            events.push(line);
        }
    }
    events.join(", ")
}
