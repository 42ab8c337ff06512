//! Fan-out over all sources, join, and build the briefing

use super::{Briefing, Section};
use crate::config::BriefingSettings;
use crate::providers::{fetch_or_fallback, Sources};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Local wall-clock reading used for the greeting and date
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub struct Aggregator {
    sources: Sources,
    clock: Arc<dyn Clock>,
    settings: BriefingSettings,
}

impl Aggregator {
    pub fn new(sources: Sources, clock: Arc<dyn Clock>, settings: BriefingSettings) -> Self {
        Self {
            sources,
            clock,
            settings,
        }
    }

    /// Run every source concurrently and wait for all of them to settle.
    ///
    /// Each source resolves to its real text or its fallback under its own
    /// deadline, so this never fails and finishes within the longest deadline.
    pub async fn build_briefing(&self) -> Briefing {
        let started = Instant::now();
        let (weather, calendar, reminders, markets, headlines) = tokio::join!(
            fetch_or_fallback(self.sources.weather.as_ref()),
            fetch_or_fallback(self.sources.calendar.as_ref()),
            fetch_or_fallback(self.sources.reminders.as_ref()),
            fetch_or_fallback(self.sources.markets.as_ref()),
            fetch_or_fallback(self.sources.headlines.as_ref()),
        );

        let briefing = Briefing::new(
            self.clock.now(),
            &self.settings.recipient_name,
            [
                (Section::Weather, weather),
                (Section::Calendar, calendar),
                (Section::Reminders, reminders),
                (Section::Markets, markets),
                (Section::Headlines, headlines),
            ],
        );

        info!(
            target = "aggregator",
            sections = briefing.sections().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Briefing built"
        );
        briefing
    }
}
