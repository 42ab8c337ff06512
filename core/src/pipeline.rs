//! End-to-end briefing call: sources → briefing → markup → chunks → document → call

use crate::briefing::{Aggregator, SystemClock};
use crate::config::CallieConfig;
use crate::providers::Sources;
use crate::speech::{chunk, compile};
use crate::telephony::{CallHandle, CallPlacer, CallRequest, CallStatus, TwilioClient};
use crate::twiml::{assemble, CallDocument};
use crate::Result;
use std::sync::Arc;
use tracing::{error, info};

pub struct BriefingCaller {
    config: Arc<CallieConfig>,
    aggregator: Aggregator,
    placer: Arc<dyn CallPlacer>,
}

impl BriefingCaller {
    pub fn new(config: Arc<CallieConfig>, aggregator: Aggregator, placer: Arc<dyn CallPlacer>) -> Self {
        Self {
            config,
            aggregator,
            placer,
        }
    }

    /// Production wiring: live sources, system clock, Twilio
    pub fn live(config: Arc<CallieConfig>) -> Result<Self> {
        let aggregator = Aggregator::new(
            Sources::live(&config.sources),
            Arc::new(SystemClock),
            config.briefing.clone(),
        );
        let placer = Arc::new(TwilioClient::new(config.twilio.clone())?);
        Ok(Self::new(config, aggregator, placer))
    }

    /// Today's briefing as plain text
    pub async fn briefing_text(&self) -> String {
        self.aggregator.build_briefing().await.render()
    }

    /// Compile, chunk and assemble `text` without placing a call
    pub fn render_document(&self, text: &str) -> Result<CallDocument> {
        let speech = &self.config.speech;
        let markup = compile(text)?;
        let chunks = chunk(markup.as_str(), speech.max_chunk_chars);
        assemble(&chunks, &speech.voice, &speech.limits)
    }

    pub async fn call_with_briefing(&self, to: Option<&str>) -> Result<CallHandle> {
        let text = self.briefing_text().await;
        let document = self.render_document(&text)?;
        self.place(&document, to).await
    }

    pub async fn call_with_text(&self, text: &str, to: Option<&str>) -> Result<CallHandle> {
        let document = self.render_document(text)?;
        info!(
            target = "pipeline",
            text_chars = text.chars().count(),
            chunks = document.chunk_count(),
            "Calling with custom text"
        );
        self.place(&document, to).await
    }

    /// Short fixed message to check the whole path works
    pub async fn test_call(&self, to: Option<&str>) -> Result<CallHandle> {
        let text = test_message(&self.config.briefing.recipient_name);
        self.call_with_text(&text, to).await
    }

    pub async fn call_status(&self, sid: &str) -> Result<CallStatus> {
        self.config.validate_credentials()?;
        self.placer.fetch_call(sid).await
    }

    async fn place(&self, document: &CallDocument, to: Option<&str>) -> Result<CallHandle> {
        self.config.validate_credentials()?;
        let to = self.config.destination(to)?;
        let request = CallRequest {
            from: self.config.twilio.from_number.clone(),
            to,
            document: document.as_str().to_string(),
            machine_detection: true,
            status_callback: self.config.status_callback.clone(),
        };

        match self.placer.create_call(&request).await {
            Ok(handle) => {
                info!(
                    target = "pipeline",
                    sid = %handle.sid,
                    from = %request.from,
                    to = %request.to,
                    voice = %self.config.speech.voice,
                    chunks = document.chunk_count(),
                    "Call initiated"
                );
                Ok(handle)
            }
            Err(e) => {
                error!(target = "pipeline", to = %request.to, error = %e, "Call failed");
                Err(e)
            }
        }
    }
}

pub fn test_message(recipient: &str) -> String {
    let hello = match recipient.trim() {
        "" => "Hello.".to_string(),
        name => format!("Hello {}.", name),
    };
    format!(
        "{} This is Callie. Your daily briefing system is online and working. Test complete.",
        hello
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::FixedClock;
    use crate::providers::{FetchResult, Section, Source};
    use crate::telephony::MockCallPlacer;
    use crate::CallieError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;

    struct Canned(Section, &'static str);

    #[async_trait]
    impl Source for Canned {
        fn section(&self) -> Section {
            self.0
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
        async fn fetch(&self) -> FetchResult<String> {
            Ok(self.1.to_string())
        }
    }

    fn config() -> Arc<CallieConfig> {
        let mut cfg = CallieConfig::new();
        cfg.twilio.account_sid = "AC1".into();
        cfg.twilio.auth_token = "token".into();
        cfg.twilio.from_number = "+15550000000".into();
        cfg.to_number = "+15551112222".into();
        cfg.briefing.recipient_name = "Joshua".into();
        Arc::new(cfg)
    }

    fn caller(placer: MockCallPlacer) -> BriefingCaller {
        let sources = Sources {
            weather: Arc::new(Canned(Section::Weather, "Clear.")),
            calendar: Arc::new(Canned(Section::Calendar, "Standup at 9")),
            reminders: Arc::new(Canned(Section::Reminders, "")),
            markets: Arc::new(Canned(Section::Markets, "S and P up 0.4 percent.")),
            headlines: Arc::new(Canned(Section::Headlines, "")),
        };
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let cfg = config();
        let aggregator = Aggregator::new(sources, Arc::new(FixedClock(now)), cfg.briefing.clone());
        BriefingCaller::new(cfg, aggregator, Arc::new(placer))
    }

    #[tokio::test]
    async fn places_call_with_assembled_document() {
        let mut placer = MockCallPlacer::new();
        placer
            .expect_create_call()
            .withf(|req: &CallRequest| {
                req.to == "+15551112222"
                    && req.from == "+15550000000"
                    && req.machine_detection
                    && req.document.starts_with("<Response>\n<Say voice=\"Polly.Joanna-Neural\">")
                    && req.document.contains("Good morning Joshua. Monday, October 19, 2026.")
                    && req.document.contains("That&apos;s your briefing.")
            })
            .times(1)
            .returning(|_| {
                Ok(CallHandle {
                    sid: "CA1".into(),
                    status: "queued".into(),
                })
            });

        let handle = caller(placer).call_with_briefing(None).await.unwrap();
        assert_eq!(handle.sid, "CA1");
    }

    #[tokio::test]
    async fn provider_error_is_propagated_without_retry() {
        let mut placer = MockCallPlacer::new();
        placer.expect_create_call().times(1).returning(|_| {
            Err(CallieError::CallPlacement {
                status: 400,
                code: Some(21211),
                message: "Invalid 'To' Phone Number".into(),
            })
        });

        let err = caller(placer)
            .call_with_text("Hello there.", Some("+1bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallieError::CallPlacement { code: Some(21211), .. }));
    }

    #[tokio::test]
    async fn missing_credentials_stop_before_provider() {
        let mut placer = MockCallPlacer::new();
        placer.expect_create_call().times(0);
        let mut c = caller(placer);
        let mut cfg = (*c.config).clone();
        cfg.twilio.auth_token.clear();
        c.config = Arc::new(cfg);

        assert!(matches!(
            c.test_call(None).await,
            Err(CallieError::Config(_))
        ));
    }

    #[test]
    fn test_message_greets_by_name() {
        assert_eq!(
            test_message("Joshua"),
            "Hello Joshua. This is Callie. Your daily briefing system is online and working. Test complete."
        );
        assert!(test_message("").starts_with("Hello. This is Callie."));
    }
}
