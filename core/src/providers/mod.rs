//! Briefing data sources
//!
//! Every source wraps one slow or unreliable external call (HTTP or a local
//! command). Sources report failures as `FetchError`, but nothing outside this
//! module ever sees one: `fetch_or_fallback` runs a source under its deadline
//! and substitutes the section's fallback text on error or timeout.

pub mod calendar;
pub mod markets;
pub mod news;
pub mod reminders;
pub mod transport;
pub mod weather;

pub use calendar::CalendarSource;
pub use markets::{MarketsConfig, MarketsSource};
pub use news::NewsSource;
pub use reminders::RemindersSource;
pub use transport::{
    CommandRunner, CommandSourceConfig, CommandSpec, HttpClient, ReqwestHttpClient,
    TokioCommandRunner,
};
pub use weather::{WeatherConfig, WeatherSource};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::SourcesConfig;

/// Sections of the briefing, in presentation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Weather,
    Calendar,
    Reminders,
    Markets,
    Headlines,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Weather,
        Section::Calendar,
        Section::Reminders,
        Section::Markets,
        Section::Headlines,
    ];

    /// Spoken label that opens the section
    pub fn label(&self) -> &'static str {
        match self {
            Section::Weather => "Weather",
            Section::Calendar => "Calendar",
            Section::Reminders => "Reminders",
            Section::Markets => "Markets",
            Section::Headlines => "Headlines",
        }
    }

    /// Text substituted when the source fails, times out or returns nothing
    pub fn fallback(&self) -> &'static str {
        match self {
            Section::Weather => "Weather unavailable",
            Section::Calendar => "Nothing scheduled",
            Section::Reminders => "No active reminders",
            Section::Markets => "Markets steady.",
            Section::Headlines => "",
        }
    }

    /// Whether `content` is worth reading out.
    ///
    /// Weather and calendar are always read, even as their fallback, so the
    /// listener knows they were checked. Reminders are skipped when there is
    /// nothing to report; markets and headlines only when empty.
    pub fn is_reportable(&self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        match self {
            Section::Reminders => content != self.fallback(),
            _ => true,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure inside a single source. Never escapes `fetch_or_fallback`.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected payload: {0}")]
    Parse(String),

    #[error("`{program}` exited with {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// One category of briefing data.
///
/// `fetch` returns the final, human-readable sentence(s) for the section. It
/// carries no timer of its own; the deadline is applied around the whole call.
#[async_trait]
pub trait Source: Send + Sync {
    fn section(&self) -> Section;

    /// Absolute deadline for `fetch`
    fn timeout(&self) -> Duration;

    async fn fetch(&self) -> FetchResult<String>;
}

/// Run `source` under its deadline and always produce text.
///
/// On timeout the in-flight future is dropped, which aborts the HTTP request
/// or kills the child process.
pub async fn fetch_or_fallback(source: &dyn Source) -> String {
    let section = source.section();
    let deadline = source.timeout();
    let started = Instant::now();

    let outcome = match timeout(deadline, source.fetch()).await {
        Ok(res) => res,
        Err(_) => Err(FetchError::Timeout(deadline)),
    };

    match outcome {
        Ok(text) if !text.trim().is_empty() => {
            debug!(
                target = "sources",
                section = %section,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Source fetched"
            );
            text.trim().to_string()
        }
        Ok(_) => {
            debug!(target = "sources", section = %section, "Source returned nothing; using fallback");
            section.fallback().to_string()
        }
        Err(e) => {
            warn!(
                target = "sources",
                section = %section,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Source failed; using fallback"
            );
            section.fallback().to_string()
        }
    }
}

/// The full set of sources consulted for one briefing
pub struct Sources {
    pub weather: Arc<dyn Source>,
    pub calendar: Arc<dyn Source>,
    pub reminders: Arc<dyn Source>,
    pub markets: Arc<dyn Source>,
    pub headlines: Arc<dyn Source>,
}

impl Sources {
    /// Wire the production sources to the given collaborators
    pub fn from_config(
        cfg: &SourcesConfig,
        http: Arc<dyn HttpClient>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            weather: Arc::new(WeatherSource::new(cfg.weather.clone(), Arc::clone(&http))),
            calendar: Arc::new(CalendarSource::new(
                cfg.calendar.clone(),
                Arc::clone(&runner),
            )),
            reminders: Arc::new(RemindersSource::new(
                cfg.reminders.clone(),
                Arc::clone(&runner),
            )),
            markets: Arc::new(MarketsSource::new(cfg.markets.clone(), http)),
            headlines: Arc::new(NewsSource::new(cfg.news.clone(), runner)),
        }
    }

    /// Production sources backed by reqwest and tokio processes
    pub fn live(cfg: &SourcesConfig) -> Self {
        let http: Arc<dyn HttpClient> =
            Arc::new(ReqwestHttpClient::new(&cfg.weather.user_agent));
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        Self::from_config(cfg, http, runner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        section: Section,
        delay: Duration,
        result: fn() -> FetchResult<String>,
    }

    #[async_trait]
    impl Source for Fixed {
        fn section(&self) -> Section {
            self.section
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }
        async fn fetch(&self) -> FetchResult<String> {
            tokio::time::sleep(self.delay).await;
            (self.result)()
        }
    }

    #[tokio::test]
    async fn returns_trimmed_value_on_success() {
        let s = Fixed {
            section: Section::Markets,
            delay: Duration::ZERO,
            result: || Ok("  S and P up 0.4 percent.\n".to_string()),
        };
        assert_eq!(fetch_or_fallback(&s).await, "S and P up 0.4 percent.");
    }

    #[tokio::test]
    async fn error_becomes_fallback() {
        let s = Fixed {
            section: Section::Weather,
            delay: Duration::ZERO,
            result: || Err(FetchError::Network("connection refused".into())),
        };
        assert_eq!(fetch_or_fallback(&s).await, "Weather unavailable");
    }

    #[tokio::test]
    async fn timeout_becomes_fallback() {
        let s = Fixed {
            section: Section::Calendar,
            delay: Duration::from_secs(5),
            result: || Ok("Standup".to_string()),
        };
        assert_eq!(fetch_or_fallback(&s).await, "Nothing scheduled");
    }

    #[tokio::test]
    async fn blank_success_becomes_fallback() {
        let s = Fixed {
            section: Section::Reminders,
            delay: Duration::ZERO,
            result: || Ok("   \n".to_string()),
        };
        assert_eq!(fetch_or_fallback(&s).await, "No active reminders");
    }

    #[test]
    fn reportable_policy() {
        assert!(Section::Weather.is_reportable("Weather unavailable"));
        assert!(Section::Calendar.is_reportable("Nothing scheduled"));
        assert!(!Section::Reminders.is_reportable("No active reminders"));
        assert!(Section::Reminders.is_reportable("Groceries"));
        assert!(Section::Markets.is_reportable("Markets steady."));
        assert!(!Section::Headlines.is_reportable(""));
        assert!(!Section::Markets.is_reportable("  "));
    }
}
