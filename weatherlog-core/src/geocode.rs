//! Forward geocoding: turn a place name into coordinates.
//! Uses the Open-Meteo geocoding API, no API key required.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Best match for a searched name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    location_url: String,
    http: Client,
}

impl Geocoder {
    pub fn new(location_url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client for geocoding")?;

        Ok(Self { location_url, http })
    }

    /// Looks `name` up; `None` when the service knows no such place.
    pub async fn lookup(&self, name: &str) -> Result<Option<Place>> {
        let res = self
            .http
            .get(&self.location_url)
            .query(&[("name", name), ("count", "1"), ("format", "json")])
            .send()
            .await
            .context("Failed to send geocoding request")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read geocoding response body")?;

        if !status.is_success() {
            return Err(anyhow!("Geocoding request failed with status {status}"));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).context("Failed to parse geocoding JSON")?;

        let place = parsed.results.into_iter().next();
        match &place {
            Some(p) => info!(
                query = name,
                name = %p.name,
                latitude = p.latitude,
                longitude = p.longitude,
                "geocoded"
            ),
            None => debug!(query = name, "no geocoding match"),
        }

        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_results_key_means_no_match() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"generationtime_ms": 0.4}"#).unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn country_is_optional() {
        let place: Place =
            serde_json::from_str(r#"{"name": "Nuuk", "latitude": 64.18, "longitude": -51.72}"#)
                .unwrap();

        assert_eq!(place.country, None);
        assert_eq!(place.longitude, -51.72);
    }
}
