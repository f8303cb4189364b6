//! Client for the Montevideo transit topology service.
//!
//! The service answers "stops for line variant V". Coordinates come back as
//! strings and the result set carries no ordering guarantee; callers filter
//! to the requested variant and sort by ordinal themselves.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MontevideoError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
}

/// A fixed stop on a line variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub stop_id: i64,
    pub variant: i64,
    pub lat: f64,
    pub lon: f64,
    /// Position in the traversal order of the variant; smaller = earlier.
    pub ordinal: i64,
}

/// Raw wire record; lat/long arrive as strings.
#[derive(Debug, Deserialize)]
struct StopRecord {
    #[serde(rename = "codigoParada")]
    stop_id: i64,
    #[serde(rename = "linea")]
    variant: i64,
    lat: String,
    long: String,
    ordinal: i64,
}

impl StopRecord {
    fn into_stop(self) -> Option<Stop> {
        let lat = self.lat.parse().ok()?;
        let lon = self.long.parse().ok()?;
        Some(Stop {
            stop_id: self.stop_id,
            variant: self.variant,
            lat,
            lon,
            ordinal: self.ordinal,
        })
    }
}

pub struct MontevideoClient {
    client: reqwest::Client,
    base_url: String,
}

impl MontevideoClient {
    pub fn new(base_url: &str) -> Result<Self, MontevideoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// All stops of the given line variant.
    pub async fn stops_by_variant(&self, variant: i64) -> Result<Vec<Stop>, MontevideoError> {
        let url = format!("{}/paradas?linea={}", self.base_url, variant);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MontevideoError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let records: Vec<StopRecord> = response.json().await?;

        let stops: Vec<Stop> = records
            .into_iter()
            .filter_map(|r| match r.into_stop() {
                Some(stop) => Some(stop),
                None => {
                    tracing::warn!(variant, "Discarding stop record with unparsable coordinates");
                    None
                }
            })
            .filter(|s| s.variant == variant)
            .collect();

        Ok(stops)
    }
}
