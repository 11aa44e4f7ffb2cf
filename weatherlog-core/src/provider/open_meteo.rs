use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    cache::{RecordWriter, TemporalCache},
    error::{GatewayError, StoreError},
    model::{CodeId, Location, LocationId, NewDaily, NewHourly, RecordKind},
};

use super::ProviderGateway;

const REQUEST_TIMEOUT_SECS: u64 = 10;

type InFlight = Mutex<HashMap<(LocationId, NaiveDate), Arc<tokio::sync::Mutex<()>>>>;

/// Open-Meteo backed gateway: archive endpoint for past dates, forecast otherwise.
#[derive(Debug)]
pub struct OpenMeteoGateway<S> {
    forecast_url: String,
    past_url: String,
    media_url: String,
    store: Arc<S>,
    http: Client,
    in_flight: InFlight,
}

impl<S> OpenMeteoGateway<S>
where
    S: TemporalCache + RecordWriter,
{
    pub fn new(
        forecast_url: String,
        past_url: String,
        media_url: String,
        store: Arc<S>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client for Open-Meteo")?;

        Ok(Self {
            forecast_url,
            past_url,
            media_url,
            store,
            http,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn forecast_url(&self) -> &str {
        &self.forecast_url
    }

    pub fn past_url(&self) -> &str {
        &self.past_url
    }

    async fn fetch_day(
        &self,
        location: &Location,
        date: NaiveDate,
        kind: RecordKind,
    ) -> Result<OmResponse, GatewayError> {
        let url = match kind {
            RecordKind::Observed => &self.past_url,
            RecordKind::Forecast => &self.forecast_url,
        };
        let day = date.format("%Y-%m-%d").to_string();

        let res = self
            .http
            .get(url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
                ("daily", "weather_code,temperature_2m_max,temperature_2m_min".to_string()),
                ("hourly", "temperature_2m,weather_code".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                GatewayError::ProviderUnavailable(format!(
                    "Failed to send request to Open-Meteo ({kind}): {e}"
                ))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            GatewayError::ProviderUnavailable(format!(
                "Failed to read Open-Meteo {kind} response body: {e}"
            ))
        })?;

        if !status.is_success() {
            return Err(GatewayError::ProviderUnavailable(format!(
                "Open-Meteo {kind} request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::ProviderUnavailable(format!(
                "Failed to parse Open-Meteo {kind} JSON: {e}"
            ))
        })
    }

    fn persist(
        &self,
        location: &Location,
        date: NaiveDate,
        kind: RecordKind,
        parsed: OmResponse,
    ) -> Result<usize, GatewayError> {
        let missing = || GatewayError::ProviderDataMissing { date };

        let daily = parsed.daily.ok_or_else(missing)?;
        let idx = daily.time.iter().position(|d| *d == date).ok_or_else(missing)?;
        let max = daily.temperature_2m_max.get(idx).copied().flatten().ok_or_else(missing)?;
        let min = daily.temperature_2m_min.get(idx).copied().flatten().ok_or_else(missing)?;
        let daily_code = daily
            .weather_code
            .get(idx)
            .copied()
            .flatten()
            .map(|value| self.code_for(value));

        let daily_id = self.store.insert_daily(NewDaily {
            location: location.id,
            date,
            kind,
            min_temperature: min,
            max_temperature: max,
            code: daily_code,
        })?;

        let mut stored = 0;
        let Some(hourly) = parsed.hourly else {
            return Ok(stored);
        };

        for (i, raw_time) in hourly.time.iter().enumerate() {
            let Ok(stamp) = NaiveDateTime::parse_from_str(raw_time, "%Y-%m-%dT%H:%M") else {
                warn!(time = %raw_time, "skipping unparseable hourly timestamp");
                continue;
            };
            if stamp.date() != date {
                continue;
            }
            let Some(temperature) = hourly.temperature_2m.get(i).copied().flatten() else {
                continue;
            };
            let code = hourly
                .weather_code
                .get(i)
                .copied()
                .flatten()
                .map(|value| self.code_for(value));

            let sample = NewHourly {
                time: stamp.time(),
                temperature,
                code,
            };
            match self.store.insert_hourly(daily_id, sample) {
                Ok(_) => stored += 1,
                Err(StoreError::DuplicateHourly { time, .. }) => {
                    warn!(%time, "provider returned the same hour twice");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(stored)
    }

    fn code_for(&self, value: i32) -> CodeId {
        let icon = format!("{}/wmo_{value}.png", self.media_url);
        self.store.ensure_code(value, wmo_description(value), &icon)
    }
}

#[async_trait]
impl<S> ProviderGateway for OpenMeteoGateway<S>
where
    S: TemporalCache + RecordWriter,
{
    async fn ingest(
        &self,
        location: &Location,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let kind = RecordKind::from_observed(self.is_past_date(date, now));
        let key = (location.id, date);

        let slot = self.in_flight.lock().entry(key).or_default().clone();
        let guard = slot.lock().await;

        // Another ingestion for the same day may have finished while we waited.
        let result = if self.store.find_daily(location.id, date, kind).is_some() {
            debug!(location = %location.name, %date, "already ingested while waiting");
            Ok(())
        } else {
            self.fetch_day(location, date, kind)
                .await
                .and_then(|parsed| self.persist(location, date, kind, parsed))
                .map(|hours| {
                    info!(location = %location.name, %date, %kind, hours, "ingested weather data");
                })
        };

        drop(guard);
        let mut in_flight = self.in_flight.lock();
        if Arc::strong_count(&slot) <= 2 {
            in_flight.remove(&key);
        }

        result
    }
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<NaiveDate>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    daily: Option<OmDaily>,
    hourly: Option<OmHourly>,
}

/// Human description of a WMO weather interpretation code.
pub fn wmo_description(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 => "Snow fall",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
