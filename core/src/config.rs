//! Runtime configuration
//!
//! One `CallieConfig` is built at process start (defaults, environment, optional
//! TOML overlay; see the `callie` binary) and handed by reference to every
//! component that needs a piece of it.

use crate::providers::{CommandSourceConfig, MarketsConfig, WeatherConfig};
use crate::twiml::DocumentLimits;
use crate::{CallieError, Result};

pub const DEFAULT_VOICE: &str = "Polly.Joanna-Neural";
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 3500;

/// Top-level configuration for one briefing process
#[derive(Debug, Clone, Default)]
pub struct CallieConfig {
    pub twilio: TwilioConfig,
    /// Number dialled when a command does not name one
    pub to_number: String,
    pub schedule: ScheduleConfig,
    /// Receives call lifecycle and answering-machine events when set
    pub status_callback: Option<String>,
    pub speech: SpeechConfig,
    pub briefing: BriefingSettings,
    pub sources: SourcesConfig,
}

/// Telephony account credentials
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
    pub request_timeout_ms: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: "https://api.twilio.com/2010-04-01".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

// Keep the auth token out of logs.
impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Daily wall-clock time for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

/// Speech rendering and provider constraints
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub voice: String,
    pub max_chunk_chars: usize,
    pub limits: DocumentLimits,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            limits: DocumentLimits::default(),
        }
    }
}

/// Presentation settings for the briefing text
#[derive(Debug, Clone, Default)]
pub struct BriefingSettings {
    /// Name used in the greeting line; omitted when empty
    pub recipient_name: String,
}

/// Per-source endpoints, commands and deadlines
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub weather: WeatherConfig,
    pub calendar: CommandSourceConfig,
    pub reminders: CommandSourceConfig,
    pub markets: MarketsConfig,
    pub news: CommandSourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            calendar: CommandSourceConfig::calendar(),
            reminders: CommandSourceConfig::reminders(),
            markets: MarketsConfig::default(),
            news: CommandSourceConfig::news(),
        }
    }
}

impl CallieConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure everything needed to talk to the telephony provider is present.
    /// Lists every missing setting at once.
    pub fn validate_credentials(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.twilio.account_sid.trim().is_empty() {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if self.twilio.auth_token.trim().is_empty() {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        if self.twilio.from_number.trim().is_empty() {
            missing.push("TWILIO_PHONE_NUMBER");
        }
        if !missing.is_empty() {
            return Err(CallieError::Config(format!(
                "missing telephony credentials: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Check ranges that would otherwise surface as odd runtime behaviour
    pub fn validate(&self) -> Result<()> {
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(CallieError::Config(format!(
                "invalid schedule time {}:{:02}",
                self.schedule.hour, self.schedule.minute
            )));
        }
        if self.speech.max_chunk_chars == 0 {
            return Err(CallieError::Config(
                "max_chunk_chars must be greater than zero".into(),
            ));
        }
        if self.speech.max_chunk_chars > self.speech.limits.max_say_chars {
            return Err(CallieError::Config(format!(
                "max_chunk_chars ({}) exceeds the provider's per-instruction limit ({})",
                self.speech.max_chunk_chars, self.speech.limits.max_say_chars
            )));
        }
        if self.speech.max_chunk_chars >= self.speech.limits.max_document_chars {
            return Err(CallieError::Config(format!(
                "max_chunk_chars ({}) leaves no room inside the document limit ({})",
                self.speech.max_chunk_chars, self.speech.limits.max_document_chars
            )));
        }
        if self.speech.voice.trim().is_empty() {
            return Err(CallieError::Config("voice must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve the destination number for a command
    pub fn destination(&self, to: Option<&str>) -> Result<String> {
        match to.map(str::trim).filter(|s| !s.is_empty()) {
            Some(n) => Ok(n.to_string()),
            None if !self.to_number.trim().is_empty() => Ok(self.to_number.clone()),
            None => Err(CallieError::Config(
                "no destination number; set YOUR_PHONE or pass --to".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_all_listed() {
        let cfg = CallieConfig::new();
        let err = cfg.validate_credentials().unwrap_err().to_string();
        assert!(err.contains("TWILIO_ACCOUNT_SID"));
        assert!(err.contains("TWILIO_AUTH_TOKEN"));
        assert!(err.contains("TWILIO_PHONE_NUMBER"));
    }

    #[test]
    fn defaults_validate() {
        let cfg = CallieConfig::new();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.schedule, ScheduleConfig { hour: 8, minute: 0 });
        assert_eq!(cfg.speech.voice, DEFAULT_VOICE);
    }

    #[test]
    fn rejects_out_of_range_schedule() {
        let mut cfg = CallieConfig::new();
        cfg.schedule.hour = 24;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_chunk_size_that_cannot_fit_the_document() {
        let mut cfg = CallieConfig::new();
        cfg.speech.limits.max_document_chars = 3_000;
        assert!(matches!(cfg.validate(), Err(CallieError::Config(_))));

        cfg.speech.max_chunk_chars = 2_500;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn destination_prefers_explicit_number() {
        let mut cfg = CallieConfig::new();
        cfg.to_number = "+15550001111".into();
        assert_eq!(cfg.destination(Some("+15559998888")).unwrap(), "+15559998888");
        assert_eq!(cfg.destination(Some("  ")).unwrap(), "+15550001111");
        assert_eq!(cfg.destination(None).unwrap(), "+15550001111");

        cfg.to_number.clear();
        assert!(cfg.destination(None).is_err());
    }

    #[test]
    fn debug_output_redacts_token() {
        let mut cfg = TwilioConfig::default();
        cfg.auth_token = "super-secret".into();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("super-secret"));
    }
}
