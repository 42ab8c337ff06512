// Callie Core Library
// Daily briefing compiler and outbound call pipeline

pub mod briefing;
pub mod config;
pub mod pipeline;
pub mod providers;
pub mod scheduler;
pub mod speech;
pub mod telephony;
pub mod twiml;

// Export core types
pub use briefing::{Aggregator, Briefing, BriefingSection, Clock, Section, SystemClock};
pub use config::{
    BriefingSettings, CallieConfig, ScheduleConfig, SourcesConfig, SpeechConfig, TwilioConfig,
};
pub use pipeline::BriefingCaller;
pub use speech::{chunk, compile, MarkupDocument};
pub use telephony::{CallHandle, CallPlacer, CallRequest, CallStatus, TwilioClient};
pub use twiml::{assemble, check_well_formed, CallDocument, DocumentLimits};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallieError {
    #[error("Compilation error: {0}")]
    Compilation(String),

    #[error("Assembly error: {0}")]
    Assembly(String),

    #[error("Call placement failed (status {status}): {message}")]
    CallPlacement {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CallieError>;
