use std::fs;
use std::path::Path;

use callie_core::config::{BriefingSettings, ScheduleConfig, SpeechConfig, TwilioConfig};
use callie_core::providers::{CommandSourceConfig, MarketsConfig, WeatherConfig};
use callie_core::CallieConfig;

/// Build the process configuration: defaults, then environment, then an
/// optional TOML file (path via CALLIE_CONFIG or ./callie.toml).
pub fn load() -> CallieConfig {
    let base = from_env(|key| std::env::var(key).ok());
    let path = std::env::var("CALLIE_CONFIG").unwrap_or_else(|_| "callie.toml".into());
    let p = Path::new(&path);
    if !p.exists() {
        tracing::debug!(target = "callie", path = %path, "No TOML config found; using defaults/env");
        return base;
    }
    match fs::read_to_string(p) {
        Ok(s) => match toml::from_str::<CallieToml>(&s) {
            Ok(t) => {
                tracing::info!(target = "callie", path = %path, "Loaded TOML config");
                t.overlay(base)
            }
            Err(e) => {
                tracing::warn!(target = "callie", error = %e, "Failed to parse TOML; using defaults/env");
                base
            }
        },
        Err(e) => {
            tracing::warn!(target = "callie", error = %e, "Failed to read TOML; using defaults/env");
            base
        }
    }
}

/// Environment layer over the defaults. `lookup` returns a variable's value.
pub fn from_env<F>(lookup: F) -> CallieConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let mut cfg = CallieConfig::new();

    if let Some(v) = var("TWILIO_ACCOUNT_SID") {
        cfg.twilio.account_sid = v;
    }
    if let Some(v) = var("TWILIO_AUTH_TOKEN") {
        cfg.twilio.auth_token = v;
    }
    if let Some(v) = var("TWILIO_PHONE_NUMBER") {
        cfg.twilio.from_number = v;
    }
    if let Some(v) = var("YOUR_PHONE") {
        cfg.to_number = v;
    }
    if let Some(v) = var("CALL_HOUR").and_then(|v| v.parse().ok()) {
        cfg.schedule.hour = v;
    }
    if let Some(v) = var("CALL_MINUTE").and_then(|v| v.parse().ok()) {
        cfg.schedule.minute = v;
    }
    cfg.status_callback = var("STATUS_CALLBACK_URL");
    if let Some(v) = var("VOICE") {
        cfg.speech.voice = v;
    }
    if let Some(v) = var("RECIPIENT_NAME") {
        cfg.briefing.recipient_name = v;
    }
    cfg
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct CallieToml {
    pub to_number: Option<String>,
    pub status_callback: Option<String>,
    pub twilio: Option<TwilioToml>,
    pub schedule: Option<ScheduleToml>,
    pub speech: Option<SpeechToml>,
    pub briefing: Option<BriefingToml>,
    pub weather: Option<WeatherToml>,
    pub markets: Option<MarketsToml>,
    pub calendar: Option<CommandToml>,
    pub reminders: Option<CommandToml>,
    pub news: Option<CommandToml>,
}

impl CallieToml {
    fn overlay(self, mut base: CallieConfig) -> CallieConfig {
        if let Some(x) = self.to_number {
            base.to_number = x;
        }
        if let Some(x) = self.status_callback {
            base.status_callback = Some(x).filter(|s| !s.is_empty());
        }
        if let Some(t) = self.twilio {
            t.apply(&mut base.twilio);
        }
        if let Some(s) = self.schedule {
            s.apply(&mut base.schedule);
        }
        if let Some(s) = self.speech {
            s.apply(&mut base.speech);
        }
        if let Some(b) = self.briefing {
            b.apply(&mut base.briefing);
        }
        if let Some(w) = self.weather {
            w.apply(&mut base.sources.weather);
        }
        if let Some(m) = self.markets {
            m.apply(&mut base.sources.markets);
        }
        if let Some(c) = self.calendar {
            c.apply(&mut base.sources.calendar);
        }
        if let Some(r) = self.reminders {
            r.apply(&mut base.sources.reminders);
        }
        if let Some(n) = self.news {
            n.apply(&mut base.sources.news);
        }
        base
    }
}

// Secrets stay in the environment; only non-secret account settings here.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TwilioToml {
    pub from_number: Option<String>,
    pub api_base: Option<String>,
    pub request_timeout_ms: Option<u64>,
}
impl TwilioToml {
    fn apply(self, t: &mut TwilioConfig) {
        if let Some(x) = self.from_number {
            t.from_number = x;
        }
        if let Some(x) = self.api_base {
            t.api_base = x;
        }
        if let Some(x) = self.request_timeout_ms {
            t.request_timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ScheduleToml {
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}
impl ScheduleToml {
    fn apply(self, s: &mut ScheduleConfig) {
        if let Some(x) = self.hour {
            s.hour = x;
        }
        if let Some(x) = self.minute {
            s.minute = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SpeechToml {
    pub voice: Option<String>,
    pub max_chunk_chars: Option<usize>,
    pub max_say_chars: Option<usize>,
    pub max_document_chars: Option<usize>,
    pub max_instructions: Option<usize>,
}
impl SpeechToml {
    fn apply(self, s: &mut SpeechConfig) {
        if let Some(x) = self.voice {
            s.voice = x;
        }
        if let Some(x) = self.max_chunk_chars {
            s.max_chunk_chars = x;
        }
        if let Some(x) = self.max_say_chars {
            s.limits.max_say_chars = x;
        }
        if let Some(x) = self.max_document_chars {
            s.limits.max_document_chars = x;
        }
        if let Some(x) = self.max_instructions {
            s.limits.max_instructions = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct BriefingToml {
    pub recipient_name: Option<String>,
}
impl BriefingToml {
    fn apply(self, b: &mut BriefingSettings) {
        if let Some(x) = self.recipient_name {
            b.recipient_name = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct WeatherToml {
    pub api_endpoint: Option<String>,
    pub geolocation_endpoint: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub temperature_unit: Option<String>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}
impl WeatherToml {
    fn apply(self, w: &mut WeatherConfig) {
        if let Some(x) = self.api_endpoint {
            w.api_endpoint = x;
        }
        if let Some(x) = self.geolocation_endpoint {
            w.geolocation_endpoint = x;
        }
        if let Some(x) = self.latitude {
            w.latitude = Some(x);
        }
        if let Some(x) = self.longitude {
            w.longitude = Some(x);
        }
        if let Some(x) = self.city {
            w.city = Some(x);
        }
        if let Some(x) = self.temperature_unit {
            w.temperature_unit = x.to_lowercase();
        }
        if let Some(x) = self.timeout_ms {
            w.timeout_ms = x;
        }
        if let Some(x) = self.user_agent {
            w.user_agent = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct MarketsToml {
    pub chart_endpoint: Option<String>,
    pub symbol: Option<String>,
    pub spoken_name: Option<String>,
    pub timeout_ms: Option<u64>,
}
impl MarketsToml {
    fn apply(self, m: &mut MarketsConfig) {
        if let Some(x) = self.chart_endpoint {
            m.chart_endpoint = x;
        }
        if let Some(x) = self.symbol {
            m.symbol = x;
        }
        if let Some(x) = self.spoken_name {
            m.spoken_name = x;
        }
        if let Some(x) = self.timeout_ms {
            m.timeout_ms = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct CommandToml {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub extra_path: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
}
impl CommandToml {
    fn apply(self, c: &mut CommandSourceConfig) {
        if let Some(x) = self.program {
            c.program = x;
        }
        if let Some(x) = self.args {
            c.args = x;
        }
        if let Some(x) = self.extra_path {
            c.extra_path = x.into_iter().filter(|p| !p.is_empty()).collect();
        }
        if let Some(x) = self.timeout_ms {
            c.timeout_ms = x;
        }
    }
}
