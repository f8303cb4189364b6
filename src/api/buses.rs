use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{respond, ErrorResponse};
use crate::core::selector::Candidate;
use crate::schedule::ScheduleEntry;
use crate::tracker::Tracker;

#[derive(Debug, Serialize, ToSchema)]
pub struct NextBusResponse {
    pub variant: i64,
    pub stop_id: i64,
    /// `null` when no bus of the variant is currently trackable.
    pub bus: Option<Candidate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EtaResponse {
    pub variant: i64,
    pub stop_id: i64,
    /// Estimated seconds until arrival; `null` when no estimate is possible.
    pub eta_seconds: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleResponse {
    pub variant: i64,
    pub entries: Vec<ScheduleEntry>,
}

/// Get the next bus of a variant to pass a stop
#[utoipa::path(
    get,
    path = "/api/variants/{variant}/stops/{stop_id}/next-bus",
    params(
        ("variant" = i64, Path, description = "Line variant id"),
        ("stop_id" = i64, Path, description = "Stop id on the variant"),
    ),
    responses(
        (status = 200, description = "Best current candidate, or null", body = NextBusResponse),
        (status = 404, description = "Stop not found on variant", body = ErrorResponse),
        (status = 502, description = "Upstream service unavailable", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn get_next_bus(
    State(tracker): State<Arc<Tracker>>,
    Path((variant, stop_id)): Path<(i64, i64)>,
) -> Result<Json<NextBusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let bus = tracker.next_bus(variant, stop_id).await.map_err(respond)?;
    Ok(Json(NextBusResponse {
        variant,
        stop_id,
        bus,
    }))
}

/// Get the estimated arrival time of the next bus at a stop
#[utoipa::path(
    get,
    path = "/api/variants/{variant}/stops/{stop_id}/eta",
    params(
        ("variant" = i64, Path, description = "Line variant id"),
        ("stop_id" = i64, Path, description = "Stop id on the variant"),
    ),
    responses(
        (status = 200, description = "Estimated seconds until arrival, or null", body = EtaResponse),
        (status = 404, description = "Stop not found on variant", body = ErrorResponse),
        (status = 502, description = "Upstream service unavailable", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn get_eta(
    State(tracker): State<Arc<Tracker>>,
    Path((variant, stop_id)): Path<(i64, i64)>,
) -> Result<Json<EtaResponse>, (StatusCode, Json<ErrorResponse>)> {
    let eta_seconds = tracker
        .eta_at_stop(variant, stop_id)
        .await
        .map_err(respond)?;
    Ok(Json(EtaResponse {
        variant,
        stop_id,
        eta_seconds,
    }))
}

/// Get the static timetable of a variant
#[utoipa::path(
    get,
    path = "/api/variants/{variant}/schedule",
    params(
        ("variant" = i64, Path, description = "Line variant id"),
    ),
    responses(
        (status = 200, description = "Timetable rows for the variant", body = ScheduleResponse),
        (status = 500, description = "Schedule file unreadable", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn get_schedule(
    State(tracker): State<Arc<Tracker>>,
    Path(variant): Path<i64>,
) -> Result<Json<ScheduleResponse>, (StatusCode, Json<ErrorResponse>)> {
    let entries = tracker.bus_schedules(variant).await.map_err(respond)?;
    Ok(Json(ScheduleResponse { variant, entries }))
}
