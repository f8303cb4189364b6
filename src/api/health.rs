use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::tracker::Tracker;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Whether a live-feed subscription is currently active
    pub subscription_active: bool,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(tracker): State<Arc<Tracker>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        subscription_active: tracker.has_active_subscription().await,
    })
}
