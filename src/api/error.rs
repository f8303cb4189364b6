use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::tracker::TrackerError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a tracker failure onto an HTTP response.
///
/// Unknown stop ids are the caller's mistake (404); external-service
/// failures are reported as 502 so clients can tell "service unavailable"
/// apart from "temporarily no bus trackable" (which is a 200 with an empty
/// payload, never an error).
pub fn respond(err: TrackerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        TrackerError::NotFound(_) | TrackerError::IncompleteHistory(_) => StatusCode::NOT_FOUND,
        TrackerError::Montevideo(_) | TrackerError::Orion(_) => StatusCode::BAD_GATEWAY,
        TrackerError::Database(_) | TrackerError::Schedule(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
