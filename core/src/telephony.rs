//! Outbound call placement
//!
//! `CallPlacer` is the seam to the telephony provider. `TwilioClient` talks to
//! the Twilio REST API; provider rejections come back as
//! `CallieError::CallPlacement` with the provider's status, code and message.
//! Nothing here retries.

use crate::config::TwilioConfig;
use crate::{CallieError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

/// Lifecycle events reported to the status callback
pub const STATUS_CALLBACK_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

/// Everything needed to place one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: String,
    pub to: String,
    /// Call-instruction document to execute when answered
    pub document: String,
    /// Ask the provider to detect answering machines (asynchronously)
    pub machine_detection: bool,
    pub status_callback: Option<String>,
}

/// Provider's acknowledgement of a created call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallHandle {
    pub sid: String,
    pub status: String,
}

/// Current state of a previously placed call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallStatus {
    pub sid: String,
    pub status: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub price_unit: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallPlacer: Send + Sync {
    async fn create_call(&self, request: &CallRequest) -> Result<CallHandle>;

    async fn fetch_call(&self, sid: &str) -> Result<CallStatus>;
}

/// Error body returned by the REST API
#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct TwilioClient {
    http: Client,
    cfg: TwilioConfig,
}

impl TwilioClient {
    pub fn new(cfg: TwilioConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()?;
        Ok(Self { http, cfg })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Calls.json",
            self.cfg.api_base.trim_end_matches('/'),
            self.cfg.account_sid
        )
    }

    fn call_url(&self, sid: &str) -> String {
        format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.cfg.api_base.trim_end_matches('/'),
            self.cfg.account_sid,
            sid
        )
    }
}

#[async_trait]
impl CallPlacer for TwilioClient {
    async fn create_call(&self, request: &CallRequest) -> Result<CallHandle> {
        let url = self.calls_url();
        debug!(target = "telephony", to = %request.to, bytes = request.document.len(), "POST {}", url);

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.cfg.account_sid, Some(&self.cfg.auth_token))
            .form(&call_form(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }
        let handle: CallHandle = resp.json().await?;
        info!(target = "telephony", sid = %handle.sid, status = %handle.status, "Call created");
        Ok(handle)
    }

    async fn fetch_call(&self, sid: &str) -> Result<CallStatus> {
        let url = self.call_url(sid);
        debug!(target = "telephony", "GET {}", url);

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.cfg.account_sid, Some(&self.cfg.auth_token))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }
        Ok(resp.json().await?)
    }
}

/// Form fields for the create-call request
pub fn call_form(request: &CallRequest) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("From", request.from.clone()),
        ("To", request.to.clone()),
        ("Twiml", request.document.clone()),
    ];
    if request.machine_detection {
        form.push(("MachineDetection", "Enable".to_string()));
        form.push(("AsyncAmd", "true".to_string()));
        if let Some(cb) = &request.status_callback {
            form.push(("AsyncAmdStatusCallback", cb.clone()));
        }
    }
    if let Some(cb) = &request.status_callback {
        form.push(("StatusCallback", cb.clone()));
        for event in STATUS_CALLBACK_EVENTS {
            form.push(("StatusCallbackEvent", event.to_string()));
        }
    }
    form
}

async fn provider_error(resp: Response) -> CallieError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ApiError>(&body).ok();
    let code = parsed.as_ref().and_then(|e| e.code);
    let message = parsed
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string());
    error!(target = "telephony", status, code = ?code, message = %message, "Provider rejected request");
    CallieError::CallPlacement {
        status,
        code,
        message,
    }
}
