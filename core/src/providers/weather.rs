/// Weather source
///
/// Locates the caller from their public IP (or a configured fixed location),
/// then reads today's forecast from the Open-Meteo API (free, no API key required).
use super::transport::HttpClient;
use super::{FetchError, FetchResult, Section, Source};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for the weather source
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Forecast endpoint (default: Open-Meteo)
    pub api_endpoint: String,
    /// IP geolocation endpoint, used when no fixed location is set
    pub geolocation_endpoint: String,
    /// Fixed coordinates; skips the IP lookup when both are set
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Spoken place name for a fixed location
    pub city: Option<String>,
    /// "celsius" or "fahrenheit"
    pub temperature_unit: String,
    /// Deadline for geolocation and forecast together, in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.open-meteo.com/v1/forecast".to_string(),
            geolocation_endpoint: "https://ipinfo.io/json".to_string(),
            latitude: None,
            longitude: None,
            city: None,
            temperature_unit: "celsius".to_string(),
            timeout_ms: 10_000,
            user_agent: "callie/0.1".to_string(),
        }
    }
}

/// Geolocation response from ipinfo
#[derive(Debug, Deserialize)]
struct IpLocation {
    /// "lat,lon"
    loc: String,
    city: Option<String>,
}

/// Forecast response from Open-Meteo
#[derive(Debug, Deserialize)]
pub struct Forecast {
    pub current: CurrentWeather,
    pub daily: DailyWeather,
}

#[derive(Debug, Deserialize)]
pub struct CurrentWeather {
    pub temperature_2m: f64,
    pub weather_code: i32,
}

#[derive(Debug, Deserialize)]
pub struct DailyWeather {
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
}

/// Weather section source
pub struct WeatherSource {
    config: WeatherConfig,
    http: Arc<dyn HttpClient>,
}

impl WeatherSource {
    pub fn new(config: WeatherConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    /// Resolve coordinates and a spoken place name
    async fn locate(&self) -> FetchResult<(f64, f64, String)> {
        if let (Some(lat), Some(lon)) = (self.config.latitude, self.config.longitude) {
            let city = self
                .config
                .city
                .clone()
                .unwrap_or_else(|| "your area".to_string());
            return Ok((lat, lon, city));
        }

        let body = self.http.get(&self.config.geolocation_endpoint).await?;
        let geo: IpLocation = serde_json::from_str(&body)?;
        let (lat, lon) = parse_coordinates(&geo.loc)?;
        let city = geo
            .city
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "your area".to_string());
        debug!(target = "weather", lat = %lat, lon = %lon, city = %city, "Located caller");
        Ok((lat, lon, city))
    }

    async fn forecast(&self, lat: f64, lon: f64) -> FetchResult<Forecast> {
        let url = format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,weather_code&daily=temperature_2m_max,temperature_2m_min,precipitation_probability_max&temperature_unit={}&timezone=auto&forecast_days=1",
            self.config.api_endpoint, lat, lon, self.config.temperature_unit
        );
        let body = self.http.get(&url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Source for WeatherSource {
    fn section(&self) -> Section {
        Section::Weather
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn fetch(&self) -> FetchResult<String> {
        let (lat, lon, city) = self.locate().await?;
        let forecast = self.forecast(lat, lon).await?;
        describe_forecast(&city, &forecast)
    }
}

fn parse_coordinates(loc: &str) -> FetchResult<(f64, f64)> {
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| FetchError::Parse(format!("bad location: {}", loc)))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| FetchError::Parse(format!("bad latitude {:?}: {}", lat, e)))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| FetchError::Parse(format!("bad longitude {:?}: {}", lon, e)))?;
    Ok((lat, lon))
}

/// Render a forecast as the spoken weather sentence
pub fn describe_forecast(city: &str, forecast: &Forecast) -> FetchResult<String> {
    let high = forecast
        .daily
        .temperature_2m_max
        .first()
        .ok_or_else(|| FetchError::Parse("missing daily high".into()))?;
    let low = forecast
        .daily
        .temperature_2m_min
        .first()
        .ok_or_else(|| FetchError::Parse("missing daily low".into()))?;

    let mut text = format!(
        "{}. Currently {} degrees, {}. High of {}, low of {}.",
        city,
        forecast.current.temperature_2m.round() as i64,
        weather_code_to_description(forecast.current.weather_code),
        high.round() as i64,
        low.round() as i64,
    );
    if let Some(Some(rain)) = forecast.daily.precipitation_probability_max.first() {
        text.push_str(&format!(
            " {}% chance of precipitation.",
            rain.round() as i64
        ));
    }
    Ok(text)
}

/// Convert WMO weather code to a spoken description
pub fn weather_code_to_description(code: i32) -> &'static str {
    match code {
        0 => "clear",
        1 => "mostly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "foggy",
        51 => "light drizzle",
        53 => "drizzle",
        55 => "heavy drizzle",
        61 => "light rain",
        63 => "rain",
        65 => "heavy rain",
        71 => "light snow",
        73 => "snow",
        75 => "heavy snow",
        77 => "snow grains",
        80 | 81 => "rain showers",
        82 => "heavy rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(json: &str) -> Forecast {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_weather_code_descriptions() {
        assert_eq!(weather_code_to_description(0), "clear");
        assert_eq!(weather_code_to_description(3), "overcast");
        assert_eq!(weather_code_to_description(63), "rain");
        assert_eq!(weather_code_to_description(82), "heavy rain showers");
        assert_eq!(weather_code_to_description(999), "unknown");
    }

    #[test]
    fn describes_full_forecast() {
        let f = forecast(
            r#"{"current":{"temperature_2m":11.6,"weather_code":2},
                "daily":{"temperature_2m_max":[14.4],"temperature_2m_min":[6.5],
                         "precipitation_probability_max":[30]}}"#,
        );
        assert_eq!(
            describe_forecast("Vancouver", &f).unwrap(),
            "Vancouver. Currently 12 degrees, partly cloudy. High of 14, low of 7. 30% chance of precipitation."
        );
    }

    #[test]
    fn omits_missing_precipitation() {
        let f = forecast(
            r#"{"current":{"temperature_2m":-2.2,"weather_code":71},
                "daily":{"temperature_2m_max":[0.1],"temperature_2m_min":[-5.0],
                         "precipitation_probability_max":[null]}}"#,
        );
        let text = describe_forecast("your area", &f).unwrap();
        assert_eq!(
            text,
            "your area. Currently -2 degrees, light snow. High of 0, low of -5."
        );
    }

    #[test]
    fn empty_daily_is_parse_error() {
        let f = forecast(
            r#"{"current":{"temperature_2m":1.0,"weather_code":0},
                "daily":{"temperature_2m_max":[],"temperature_2m_min":[]}}"#,
        );
        assert!(matches!(describe_forecast("x", &f), Err(FetchError::Parse(_))));
    }

    #[test]
    fn parses_ipinfo_coordinates() {
        assert_eq!(parse_coordinates("49.2497,-123.1193").unwrap(), (49.2497, -123.1193));
        assert!(parse_coordinates("nowhere").is_err());
    }
}
