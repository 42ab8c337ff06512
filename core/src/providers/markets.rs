/// Markets source
///
/// Reads the daily chart for an index from Yahoo Finance and reports the
/// move against the previous close.
use super::transport::HttpClient;
use super::{FetchError, FetchResult, Section, Source};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the markets source
#[derive(Debug, Clone)]
pub struct MarketsConfig {
    /// Chart endpoint; the symbol is appended as a path segment
    pub chart_endpoint: String,
    pub symbol: String,
    /// How the index is read out
    pub spoken_name: String,
    pub timeout_ms: u64,
}

impl Default for MarketsConfig {
    fn default() -> Self {
        Self {
            chart_endpoint: "https://query2.finance.yahoo.com/v8/finance/chart".to_string(),
            symbol: "^GSPC".to_string(),
            spoken_name: "S and P".to_string(),
            timeout_ms: 8_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: f64,
    chart_previous_close: f64,
}

pub struct MarketsSource {
    config: MarketsConfig,
    http: Arc<dyn HttpClient>,
}

impl MarketsSource {
    pub fn new(config: MarketsConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl Source for MarketsSource {
    fn section(&self) -> Section {
        Section::Markets
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn fetch(&self) -> FetchResult<String> {
        let url = format!(
            "{}/{}?interval=1d&range=1d",
            self.config.chart_endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.config.symbol)
        );
        let body = self.http.get(&url).await?;
        let chart: ChartResponse = serde_json::from_str(&body)?;
        let meta = chart
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| FetchError::Parse("chart has no result".into()))?
            .meta;
        describe_move(
            &self.config.spoken_name,
            meta.regular_market_price,
            meta.chart_previous_close,
        )
    }
}

/// "S and P up 0.4 percent."
pub fn describe_move(name: &str, price: f64, previous_close: f64) -> FetchResult<String> {
    if !previous_close.is_finite() || previous_close == 0.0 || !price.is_finite() {
        return Err(FetchError::Parse(format!(
            "unusable prices: {} against {}",
            price, previous_close
        )));
    }
    let pct = ((price - previous_close) / previous_close * 1000.0).round() / 10.0;
    let direction = if pct >= 0.0 { "up" } else { "down" };
    Ok(format!("{} {} {:.1} percent.", name, direction, pct.abs()))
}

// Path-segment encoding for ticker symbols such as ^GSPC
mod urlencoding {
    pub fn encode(s: &str) -> String {
        s.chars()
            .map(|c| match c {
                'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
                _ => {
                    let mut buf = [0; 4];
                    let bytes = c.encode_utf8(&mut buf).as_bytes();
                    bytes.iter().map(|b| format!("%{:02X}", b)).collect()
                }
            })
            .collect()
    }
}
