pub mod accumulate;
pub mod buses;
pub mod error;
pub mod health;

pub use error::ErrorResponse;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::tracker::Tracker;

pub fn router(tracker: Arc<Tracker>) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/variants/{variant}/schedule", get(buses::get_schedule))
        .route(
            "/api/variants/{variant}/stops/{stop_id}/next-bus",
            get(buses::get_next_bus),
        )
        .route(
            "/api/variants/{variant}/stops/{stop_id}/eta",
            get(buses::get_eta),
        )
        // Webhook the live feed delivers position changes to; not part of
        // the documented public API.
        .route("/orion/accumulate", post(accumulate::accumulate))
        .with_state(tracker)
}
