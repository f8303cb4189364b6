//! The long-lived service context composing the engine with its
//! collaborators: the topology service, the live feed, the schedule file and
//! the fix history.

use std::path::PathBuf;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::crossing::{self, CrossingGate, IncompleteHistory};
use crate::core::geo::Point;
use crate::core::selector::{select_candidate, Candidate};
use crate::core::stops::{upstream_stops, StopNotFound};
use crate::history::{Fix, FixStore};
use crate::providers::montevideo::{MontevideoClient, MontevideoError, Stop};
use crate::providers::orion::{Notification, OrionClient, OrionError, Subscription};
use crate::schedule::{schedules_for_variant, ScheduleEntry, ScheduleError};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    NotFound(#[from] StopNotFound),
    #[error("Topology service failed: {0}")]
    Montevideo(#[from] MontevideoError),
    #[error("Live feed failed: {0}")]
    Orion(#[from] OrionError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    IncompleteHistory(#[from] IncompleteHistory),
}

pub struct Tracker {
    montevideo: MontevideoClient,
    orion: OrionClient,
    fixes: FixStore,
    schedule_path: PathBuf,
    crossing_gate: CrossingGate,
    public_url: String,
    /// Active feed subscription; set at startup, replaced on resubscription,
    /// read (never mutated) by ingest.
    subscription: RwLock<Option<Subscription>>,
}

impl Tracker {
    pub fn new(config: &Config, pool: sqlx::SqlitePool) -> Result<Self, TrackerError> {
        Ok(Self {
            montevideo: MontevideoClient::new(&config.montevideo_url)?,
            orion: OrionClient::new(&config.orion_url, config.near_max_distance_meters)?,
            fixes: FixStore::new(pool),
            schedule_path: config.schedule_path.clone(),
            crossing_gate: config.crossing_gate(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            subscription: RwLock::new(None),
        })
    }

    /// Timetable rows for the variant from the static schedule file.
    pub async fn bus_schedules(&self, variant: i64) -> Result<Vec<ScheduleEntry>, TrackerError> {
        Ok(schedules_for_variant(&self.schedule_path, variant)?)
    }

    /// All stops of the variant, unordered.
    pub async fn variant_stops(&self, variant: i64) -> Result<Vec<Stop>, TrackerError> {
        Ok(self.montevideo.stops_by_variant(variant).await?)
    }

    /// The single stop of the variant with the given id.
    pub async fn variant_stop(&self, variant: i64, stop_id: i64) -> Result<Stop, TrackerError> {
        let stops = self.variant_stops(variant).await?;
        stops
            .into_iter()
            .find(|s| s.stop_id == stop_id)
            .ok_or_else(|| StopNotFound { variant, stop_id }.into())
    }

    /// The next bus of the variant to pass the stop, or `None` when no bus is
    /// currently trackable.
    ///
    /// Queries the live feed once per upstream stop concurrently; results are
    /// joined back in ascending-ordinal order and any single query failure
    /// fails the whole operation.
    pub async fn next_bus(
        &self,
        variant: i64,
        stop_id: i64,
    ) -> Result<Option<Candidate>, TrackerError> {
        let stops = self.variant_stops(variant).await?;
        let upstream = upstream_stops(stops, variant, stop_id)?;

        let queries = upstream.iter().map(|stop| {
            let point = Point::new(stop.lat, stop.lon);
            async move { (stop.ordinal, self.orion.buses_near(variant, point).await) }
        });

        let mut per_stop = Vec::with_capacity(upstream.len());
        for (ordinal, result) in join_all(queries).await {
            per_stop.push((ordinal, result?));
        }

        Ok(select_candidate(&per_stop))
    }

    /// The last bus of the variant observed near the stop, from history.
    pub async fn last_bus_near_stop(
        &self,
        variant: i64,
        stop_id: i64,
    ) -> Result<Option<Fix>, TrackerError> {
        let stop = self.variant_stop(variant, stop_id).await?;
        let point = Point::new(stop.lat, stop.lon);
        Ok(self.fixes.last_fix_near(variant, point).await?)
    }

    /// Elapsed seconds the bus took between two points, from its history.
    pub async fn elapsed_between(
        &self,
        bus_id: &str,
        from: Point,
        to: Point,
    ) -> Result<i64, TrackerError> {
        let fixes = self.fixes.fixes_for_bus(bus_id).await?;
        Ok(crossing::elapsed_between(
            bus_id,
            &fixes,
            from,
            to,
            self.crossing_gate,
        )?)
    }

    /// Estimated seconds until the next bus reaches the stop.
    ///
    /// Runs the next-bus selection and the last-bus-near-stop lookup in
    /// parallel, then measures how long the last bus took to travel from the
    /// next bus's current position to the stop. `None` when either lookup
    /// comes up empty or the last bus's history lacks the crossings.
    pub async fn eta_at_stop(
        &self,
        variant: i64,
        stop_id: i64,
    ) -> Result<Option<i64>, TrackerError> {
        let (next, last) = tokio::try_join!(
            self.next_bus(variant, stop_id),
            self.last_bus_near_stop(variant, stop_id)
        )?;

        let (Some(next), Some(last)) = (next, last) else {
            return Ok(None);
        };

        match self
            .elapsed_between(&last.bus_id, next.position, last.position())
            .await
        {
            Ok(elapsed) => Ok(Some(elapsed)),
            Err(TrackerError::IncompleteHistory(e)) => {
                info!(error = %e, "No ETA: insufficient history for reference bus");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Stores the fixes of an inbound feed notification. Returns how many
    /// fixes were written.
    ///
    /// Deliveries under a subscription id other than the active one are
    /// discarded. Per-entry persistence failures are logged and never fail
    /// the caller.
    pub async fn ingest(&self, notification: Notification) -> usize {
        let active = self.subscription.read().await;
        let matches = active
            .as_ref()
            .is_some_and(|s| s.id == notification.subscription_id);
        if !matches {
            warn!(
                subscription_id = %notification.subscription_id,
                "Discarding notification for unknown subscription"
            );
            return 0;
        }
        drop(active);

        let mut written = 0;
        for entity in &notification.data {
            let (Some(position), Some(variant), Some(timestamp)) =
                (entity.position(), entity.variant(), entity.timestamp_epoch())
            else {
                warn!(bus_id = %entity.id, "Discarding malformed feed entry");
                continue;
            };

            let fix = Fix {
                bus_id: entity.id.clone(),
                variant,
                latitude: position.lat,
                longitude: position.lon,
                timestamp,
            };

            match self.fixes.insert(&fix).await {
                Ok(()) => written += 1,
                Err(e) => warn!(bus_id = %fix.bus_id, error = %e, "Failed to store fix"),
            }
        }
        written
    }

    /// Registers the accumulate webhook with the live feed and retains the
    /// subscription id for validating notifications.
    pub async fn subscribe(&self) -> Result<(), TrackerError> {
        let callback = format!("{}/orion/accumulate", self.public_url);
        let subscription = self.orion.subscribe(&callback).await?;
        info!(subscription_id = %subscription.id, "Subscribed to bus location changes");
        self.set_subscription(subscription).await;
        Ok(())
    }

    /// Tears down the active subscription, if any.
    pub async fn unsubscribe(&self) -> Result<(), TrackerError> {
        let Some(subscription) = self.subscription.write().await.take() else {
            return Ok(());
        };
        self.orion.unsubscribe(&subscription).await?;
        info!(subscription_id = %subscription.id, "Unsubscribed from bus location changes");
        Ok(())
    }

    /// Replaces the active subscription (startup and resubscription path).
    pub async fn set_subscription(&self, subscription: Subscription) {
        *self.subscription.write().await = Some(subscription);
    }

    pub async fn has_active_subscription(&self) -> bool {
        self.subscription.read().await.is_some()
    }
}
