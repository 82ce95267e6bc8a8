//! Current-weather line for the display sidebar.
//!
//! Failures never reach the board's content; they only turn the line into
//! [`UNAVAILABLE`].

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    config::WeatherConfig,
    error::{AppError, Result},
};

pub const UNAVAILABLE: &str = "Weather unavailable";

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature_c: i64,
    pub description: String,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°C • {}", self.temperature_c, self.description)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: Option<String>,
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads an OpenWeatherMap current-weather body. The API reports errors with
/// a non-200 `cod`, sometimes as a string.
pub fn parse_report(body: &Value) -> Result<WeatherReport> {
    if let Some(cod) = body.get("cod") {
        let code = cod
            .as_i64()
            .or_else(|| cod.as_str().and_then(|s| s.parse().ok()));
        if code != Some(200) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(AppError::External(format!("weather API returned {}: {}", cod, message)));
        }
    }

    let current: CurrentWeather = serde_json::from_value(body.clone())
        .map_err(|e| AppError::External(format!("unexpected weather payload: {}", e)))?;

    let description = current
        .weather
        .first()
        .and_then(|c| c.description.as_deref())
        .filter(|d| !d.is_empty())
        .map(title_case)
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(WeatherReport {
        temperature_c: current.main.temp.round() as i64,
        description,
    })
}

pub struct WeatherClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
}

impl WeatherClient {
    /// `None` when the widget is disabled or has no API key.
    pub fn from_config(config: &WeatherConfig) -> Result<Option<Self>> {
        let api_key = match (&config.api_key, config.enabled) {
            (Some(key), true) if !key.trim().is_empty() => key.trim().to_string(),
            (_, true) => {
                tracing::warn!("Weather enabled but no api_key configured");
                return Ok(None);
            }
            _ => return Ok(None),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Some(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            latitude: config.latitude,
            longitude: config.longitude,
        }))
    }

    pub async fn current(&self) -> Result<WeatherReport> {
        let body: Value = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?
            .json()
            .await?;

        parse_report(&body)
    }
}

/// Polls immediately and then every `interval`, publishing the display line.
pub async fn run_weather(
    client: Option<WeatherClient>,
    interval: Duration,
    weather_tx: watch::Sender<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    let Some(client) = client else {
        tracing::info!("Weather widget disabled");
        weather_tx.send_replace(UNAVAILABLE.to_string());
        return;
    };

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let line = match client.current().await {
                    Ok(report) => {
                        tracing::debug!(%report, "weather refreshed");
                        report.to_string()
                    }
                    Err(e) => {
                        tracing::warn!("Weather fetch failed: {}", e);
                        UNAVAILABLE.to_string()
                    }
                };
                weather_tx.send_replace(line);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
