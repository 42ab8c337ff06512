//! Headlines source: numbered digest printed by a local news command

use super::transport::{CommandRunner, CommandSourceConfig};
use super::{FetchResult, Section, Source};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const MAX_HEADLINES: usize = 2;

fn re_numbered() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s+(.*)$").expect("numbered line regex should compile"))
}

pub struct NewsSource {
    config: CommandSourceConfig,
    runner: Arc<dyn CommandRunner>,
}

impl NewsSource {
    pub fn new(config: CommandSourceConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }
}

#[async_trait]
impl Source for NewsSource {
    fn section(&self) -> Section {
        Section::Headlines
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn fetch(&self) -> FetchResult<String> {
        let stdout = self.runner.run(&self.config.spec()).await?;
        Ok(extract_headlines(&stdout, MAX_HEADLINES).join("\n"))
    }
}

/// Headline titles from lines like `1. Title`, numbering stripped.
/// Each title ends with terminal punctuation so it reads as a sentence.
pub fn extract_headlines(stdout: &str, max: usize) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| re_numbered().captures(line.trim()))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|title| !title.is_empty())
        .take(max)
        .map(|mut title| {
            if !title.ends_with(|c: char| matches!(c, '.' | '!' | '?')) {
                title.push('.');
            }
            title
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_two_numbered_lines() {
        let out = "Top stories today\n1. Congress passes budget\n   2.  Storm hits coast!\n3. Third story\n";
        assert_eq!(
            extract_headlines(out, 2),
            vec!["Congress passes budget.", "Storm hits coast!"]
        );
    }

    #[test]
    fn ignores_unnumbered_output() {
        assert!(extract_headlines("no list here\n- bullet\n1.no space", 2).is_empty());
    }
}
