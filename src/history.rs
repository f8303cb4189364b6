//! Append-only store of vehicle position fixes, backed by SQLite.

use sqlx::{FromRow, SqlitePool};

use crate::core::geo::{haversine_distance, Point};
use crate::core::CROSSING_TOLERANCE_METERS;

/// How many recent fixes of a variant are scanned when looking for the last
/// bus near a stop. Feed entries arrive every few seconds per bus, so this
/// covers well over an hour of a variant's traffic.
const NEAR_SCAN_LIMIT: i64 = 2000;

/// One observed position sample for a bus. Immutable once stored.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Fix {
    pub bus_id: String,
    pub variant: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds since epoch.
    pub timestamp: i64,
}

impl Fix {
    pub fn position(&self) -> Point {
        Point::new(self.latitude, self.longitude)
    }
}

/// Read/write access to the fix history.
#[derive(Clone)]
pub struct FixStore {
    pool: SqlitePool,
}

impl FixStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, fix: &Fix) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO fixes (bus_id, variant, latitude, longitude, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&fix.bus_id)
        .bind(fix.variant)
        .bind(fix.latitude)
        .bind(fix.longitude)
        .bind(fix.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All fixes of a bus, most recent first - the order the crossing
    /// detector consumes.
    pub async fn fixes_for_bus(&self, bus_id: &str) -> Result<Vec<Fix>, sqlx::Error> {
        sqlx::query_as(
            "SELECT bus_id, variant, latitude, longitude, timestamp \
             FROM fixes WHERE bus_id = ? ORDER BY timestamp DESC",
        )
        .bind(bus_id)
        .fetch_all(&self.pool)
        .await
    }

    /// The most recent fix of any bus of the variant within crossing
    /// tolerance of `point`, i.e. the last bus observed at that stop.
    ///
    /// SQLite has no spatial index, so the distance filter runs in Rust over
    /// the variant's recent fixes.
    pub async fn last_fix_near(
        &self,
        variant: i64,
        point: Point,
    ) -> Result<Option<Fix>, sqlx::Error> {
        let fixes: Vec<Fix> = sqlx::query_as(
            "SELECT bus_id, variant, latitude, longitude, timestamp \
             FROM fixes WHERE variant = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(variant)
        .bind(NEAR_SCAN_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(fixes
            .into_iter()
            .find(|f| haversine_distance(point, f.position()) < CROSSING_TOLERANCE_METERS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> FixStore {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");
        FixStore::new(pool)
    }

    fn fix(bus_id: &str, lat: f64, lon: f64, timestamp: i64) -> Fix {
        Fix {
            bus_id: bus_id.to_string(),
            variant: 8870,
            latitude: lat,
            longitude: lon,
            timestamp,
        }
    }

    #[tokio::test]
    async fn round_trip_preserves_fields() {
        let store = memory_store().await;
        let written = fix("bus-145", -34.9011, -56.1645, 1_700_000_000);
        store.insert(&written).await.unwrap();

        let read = store.fixes_for_bus("bus-145").await.unwrap();
        assert_eq!(read, vec![written]);
    }

    #[tokio::test]
    async fn fixes_come_back_most_recent_first() {
        let store = memory_store().await;
        // Inserted out of timestamp order on purpose.
        store.insert(&fix("bus-145", -34.90, -56.16, 200)).await.unwrap();
        store.insert(&fix("bus-145", -34.91, -56.17, 400)).await.unwrap();
        store.insert(&fix("bus-145", -34.92, -56.18, 300)).await.unwrap();

        let read = store.fixes_for_bus("bus-145").await.unwrap();
        let timestamps: Vec<i64> = read.iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![400, 300, 200]);
    }

    #[tokio::test]
    async fn last_fix_near_picks_most_recent_within_tolerance() {
        let store = memory_store().await;
        let stop = Point::new(-34.9000, -56.1600);

        // Near the stop, older.
        store.insert(&fix("bus-1", -34.9001, -56.1601, 100)).await.unwrap();
        // Near the stop, newer.
        store.insert(&fix("bus-2", -34.9002, -56.1600, 200)).await.unwrap();
        // Far away, newest.
        store.insert(&fix("bus-3", -34.9500, -56.2200, 300)).await.unwrap();

        let found = store.last_fix_near(8870, stop).await.unwrap().unwrap();
        assert_eq!(found.bus_id, "bus-2");
    }

    #[tokio::test]
    async fn last_fix_near_is_none_when_nothing_in_tolerance() {
        let store = memory_store().await;
        store.insert(&fix("bus-1", -34.9500, -56.2200, 100)).await.unwrap();

        let stop = Point::new(-34.9000, -56.1600);
        assert!(store.last_fix_near(8870, stop).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn variants_are_isolated() {
        let store = memory_store().await;
        let mut other = fix("bus-9", -34.9000, -56.1600, 100);
        other.variant = 1234;
        store.insert(&other).await.unwrap();

        let stop = Point::new(-34.9000, -56.1600);
        assert!(store.last_fix_near(8870, stop).await.unwrap().is_none());
    }
}
