//! Client for the Orion context broker (NGSI v2).
//!
//! Orion is the live vehicle-position feed: it answers spatial entity
//! queries ("buses of variant V near point P", results ranked by the
//! broker's own proximity ordering) and delivers position changes to our
//! accumulate webhook through a subscription.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::core::geo::Point;

#[derive(Debug, Error)]
pub enum OrionError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Subscription response carried no id")]
    MissingSubscriptionId,
}

/// A registered subscription with the live feed. The id validates inbound
/// notifications against stale or foreign deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
}

/// One vehicle state entry in NGSI normalized form.
#[derive(Debug, Clone, Deserialize)]
pub struct BusEntity {
    pub id: String,
    #[serde(rename = "linea")]
    pub line: Option<Attribute>,
    pub location: Option<LocationAttribute>,
    pub timestamp: Option<Attribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationAttribute {
    pub value: GeoPoint,
}

/// GeoJSON point; coordinates are `[longitude, latitude]` on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPoint {
    pub coordinates: Vec<f64>,
}

impl BusEntity {
    /// Reported position with coordinates swapped into (lat, lon) order.
    pub fn position(&self) -> Option<Point> {
        let coords = &self.location.as_ref()?.value.coordinates;
        match coords.as_slice() {
            [lon, lat, ..] => Some(Point::new(*lat, *lon)),
            _ => None,
        }
    }

    /// Line variant; Orion reports it as a number or a numeric string
    /// depending on the upstream publisher.
    pub fn variant(&self) -> Option<i64> {
        let value = &self.line.as_ref()?.value;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    /// Reported timestamp converted to epoch seconds.
    pub fn timestamp_epoch(&self) -> Option<i64> {
        let value = self.timestamp.as_ref()?.value.as_str()?;
        chrono::DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.timestamp())
    }

    #[cfg(test)]
    pub fn with_position(id: &str, variant: i64, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            line: Some(Attribute {
                value: serde_json::Value::from(variant),
            }),
            location: Some(LocationAttribute {
                value: GeoPoint {
                    coordinates: vec![lon, lat],
                },
            }),
            timestamp: None,
        }
    }
}

/// An inbound feed delivery: one or more vehicle state entries under a
/// subscription id.
#[derive(Debug, Deserialize)]
pub struct Notification {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    #[serde(default)]
    pub data: Vec<BusEntity>,
}

pub struct OrionClient {
    client: reqwest::Client,
    base_url: String,
    max_distance_meters: u32,
}

impl OrionClient {
    pub fn new(base_url: &str, max_distance_meters: u32) -> Result<Self, OrionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_distance_meters,
        })
    }

    /// Buses of the variant currently near the point. An empty result is a
    /// valid response; the broker orders results by proximity.
    pub async fn buses_near(
        &self,
        variant: i64,
        point: Point,
    ) -> Result<Vec<BusEntity>, OrionError> {
        let url = format!(
            "{}/v2/entities?type=Bus&q={}&georel={}&geometry=point&coords={},{}",
            self.base_url,
            urlencoding::encode(&format!("linea=={variant}")),
            urlencoding::encode(&format!("near;maxDistance:{}", self.max_distance_meters)),
            point.lat,
            point.lon,
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(OrionError::ApiError(format!("HTTP {}", response.status())));
        }

        Ok(response.json().await?)
    }

    /// Registers the accumulate webhook for bus location changes and returns
    /// the subscription to validate future notifications against.
    pub async fn subscribe(&self, callback_url: &str) -> Result<Subscription, OrionError> {
        let body = json!({
            "description": "bondi bus location changes",
            "subject": {
                "entities": [{ "idPattern": ".*", "type": "Bus" }],
                "condition": { "attrs": ["location"] }
            },
            "notification": {
                "http": { "url": callback_url },
                "attrs": ["linea", "location", "timestamp"]
            }
        });

        let response = self
            .client
            .post(format!("{}/v2/subscriptions", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OrionError::ApiError(format!("HTTP {}", response.status())));
        }

        // NGSI v2 returns the id in the Location header: /v2/subscriptions/{id}
        let id = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_subscription_id)
            .ok_or(OrionError::MissingSubscriptionId)?;

        Ok(Subscription { id })
    }

    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), OrionError> {
        let response = self
            .client
            .delete(format!(
                "{}/v2/subscriptions/{}",
                self.base_url, subscription.id
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OrionError::ApiError(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

fn parse_subscription_id(location: &str) -> Option<String> {
    let id = location.rsplit('/').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
