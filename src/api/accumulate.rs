use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::debug;

use crate::providers::orion::Notification;
use crate::tracker::Tracker;

/// Receives position-change notifications from the live feed.
///
/// Always answers 204: persistence is best-effort and the broker retries
/// nothing useful on error anyway. Mismatched subscriptions are discarded
/// inside the tracker.
pub async fn accumulate(
    State(tracker): State<Arc<Tracker>>,
    Json(notification): Json<Notification>,
) -> StatusCode {
    let entries = notification.data.len();
    let written = tracker.ingest(notification).await;
    debug!(entries, written, "Processed feed notification");
    StatusCode::NO_CONTENT
}
