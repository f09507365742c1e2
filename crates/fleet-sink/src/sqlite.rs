//! SQLite store backend (feature `sqlite`).
//!
//! Three tables mirror the fleet tracking schema:
//!
//! | Table               | Written on                          |
//! |---------------------|-------------------------------------|
//! | `vehicles`          | assignment, every status change     |
//! | `routes`            | assignment                          |
//! | `vehicle_positions` | every sample (append-only)          |
//!
//! Status is stored as text and constrained to the three lifecycle values.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;
use fleet_route::{LineString, RouteGeometry, RoutePlan};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{RouteRow, SampleSink, SinkError, SinkResult, VehicleRow};

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous  = NORMAL;
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS vehicles (
        id         TEXT    PRIMARY KEY,
        start_lat  REAL    NOT NULL,
        start_lng  REAL    NOT NULL,
        end_lat    REAL    NOT NULL,
        end_lng    REAL    NOT NULL,
        speed      REAL    NOT NULL,
        status     TEXT    NOT NULL DEFAULT 'moving'
                           CHECK (status IN ('moving', 'finished', 'idle')),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS vehicle_positions (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        vehicle_id TEXT    NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        lat        REAL    NOT NULL,
        lng        REAL    NOT NULL,
        heading    REAL    NOT NULL DEFAULT 0,
        progress   REAL    NOT NULL DEFAULT 0,
        timestamp  INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_vehicle_positions_vehicle_ts
        ON vehicle_positions (vehicle_id, timestamp DESC);
    CREATE TABLE IF NOT EXISTS routes (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        vehicle_id TEXT    NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        geometry   TEXT    NOT NULL,
        distance   REAL    NOT NULL,
        duration   REAL    NOT NULL,
        created_at INTEGER NOT NULL
    );
";

/// Persists simulator output to an SQLite database.
///
/// One connection guarded by a mutex; shard threads take turns.  Each write
/// sets the connection's busy timeout to the caller's timeout, so a locked
/// database surfaces as a transient `DatabaseBusy` error the dispatcher
/// retries.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> SinkResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> SinkResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SinkResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_with_timeout(&self, timeout: Duration) -> SinkResult<MutexGuard<'_, Connection>> {
        let conn = self.lock();
        conn.busy_timeout(timeout)?;
        Ok(conn)
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// The most recent stored sample for `vehicle`.
    pub fn latest_position(&self, vehicle: VehicleId) -> SinkResult<Option<PositionSample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT vehicle_id, lat, lng, heading, progress, timestamp
               FROM vehicle_positions
              WHERE vehicle_id = ?1
              ORDER BY timestamp DESC, id DESC
              LIMIT 1",
        )?;
        let raw = stmt.query_row(params![vehicle.to_string()], RawSample::from_row).optional()?;
        raw.map(RawSample::into_sample).transpose()
    }

    /// The most recent stored sample of every vehicle, ordered by vehicle id.
    pub fn latest_positions(&self) -> SinkResult<Vec<PositionSample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT p.vehicle_id, p.lat, p.lng, p.heading, p.progress, p.timestamp
               FROM vehicle_positions p
              WHERE p.id = (SELECT q.id FROM vehicle_positions q
                             WHERE q.vehicle_id = p.vehicle_id
                             ORDER BY q.timestamp DESC, q.id DESC
                             LIMIT 1)
              ORDER BY p.vehicle_id",
        )?;
        let raws = stmt
            .query_map([], RawSample::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawSample::into_sample).collect()
    }

    /// Every stored sample of `vehicle`, oldest first.
    pub fn positions(&self, vehicle: VehicleId) -> SinkResult<Vec<PositionSample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT vehicle_id, lat, lng, heading, progress, timestamp
               FROM vehicle_positions
              WHERE vehicle_id = ?1
              ORDER BY timestamp, id",
        )?;
        let raws = stmt
            .query_map(params![vehicle.to_string()], RawSample::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawSample::into_sample).collect()
    }

    pub fn vehicle_status(&self, vehicle: VehicleId) -> SinkResult<Option<VehicleStatus>> {
        let status: Option<String> = self
            .lock()
            .query_row(
                "SELECT status FROM vehicles WHERE id = ?1",
                params![vehicle.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map(|s| s.parse()).transpose()?)
    }

    /// The stored route of `vehicle`, decoded back into a geometry.
    pub fn route_geometry(&self, vehicle: VehicleId) -> SinkResult<Option<RouteGeometry>> {
        let row: Option<(String, f64, f64)> = self
            .lock()
            .query_row(
                "SELECT geometry, distance, duration FROM routes
                  WHERE vehicle_id = ?1
                  ORDER BY id DESC LIMIT 1",
                params![vehicle.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((geometry, distance, duration)) = row else {
            return Ok(None);
        };
        let geometry: LineString = serde_json::from_str(&geometry)?;
        Ok(Some(RoutePlan { geometry, distance, duration }.into_geometry()?))
    }

    pub fn vehicle_count(&self) -> SinkResult<u64> {
        let count: i64 = self.lock().query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl SampleSink for SqliteStore {
    /// A re-assigned id keeps its row (and earlier positions) with the new
    /// endpoints and status; the new route is appended.
    fn register_vehicle(&self, vehicle: &VehicleRow, route: &RouteRow, timeout: Duration) -> SinkResult<()> {
        let conn = self.lock_with_timeout(timeout)?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO vehicles
                 (id, start_lat, start_lng, end_lat, end_lng, speed, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (id) DO UPDATE SET
                 start_lat  = excluded.start_lat,
                 start_lng  = excluded.start_lng,
                 end_lat    = excluded.end_lat,
                 end_lng    = excluded.end_lng,
                 speed      = excluded.speed,
                 status     = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                vehicle.id.to_string(),
                vehicle.start.lat,
                vehicle.start.lng,
                vehicle.end.lat,
                vehicle.end.lng,
                vehicle.speed_kmh,
                vehicle.status.as_str(),
                vehicle.created_at_ms,
                vehicle.updated_at_ms,
            ],
        )?;
        tx.execute(
            "INSERT INTO routes (vehicle_id, geometry, distance, duration, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                route.vehicle_id.to_string(),
                route.geometry,
                route.distance_m,
                route.duration_s,
                route.created_at_ms,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn write_sample(&self, sample: &PositionSample, timeout: Duration) -> SinkResult<()> {
        let conn = self.lock_with_timeout(timeout)?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO vehicle_positions (vehicle_id, lat, lng, heading, progress, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        stmt.execute(params![
            sample.vehicle_id.to_string(),
            sample.lat,
            sample.lng,
            sample.heading,
            sample.progress,
            sample.timestamp_ms,
        ])?;
        Ok(())
    }

    fn update_status(&self, vehicle: VehicleId, status: VehicleStatus, at_ms: i64, timeout: Duration) -> SinkResult<()> {
        let conn = self.lock_with_timeout(timeout)?;
        conn.execute(
            "UPDATE vehicles SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![vehicle.to_string(), status.as_str(), at_ms],
        )?;
        Ok(())
    }

    fn reset(&self) -> SinkResult<()> {
        self.lock().execute_batch(
            "BEGIN;
             DELETE FROM vehicle_positions;
             DELETE FROM routes;
             DELETE FROM vehicles;
             COMMIT;",
        )?;
        Ok(())
    }

    fn flush(&self) -> SinkResult<()> {
        self.lock().execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

// ── Row decoding ──────────────────────────────────────────────────────────────

/// A `vehicle_positions` row before the id text is parsed.
struct RawSample {
    vehicle_id:   String,
    lat:          f64,
    lng:          f64,
    heading:      f64,
    progress:     f64,
    timestamp_ms: i64,
}

impl RawSample {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            vehicle_id:   row.get(0)?,
            lat:          row.get(1)?,
            lng:          row.get(2)?,
            heading:      row.get(3)?,
            progress:     row.get(4)?,
            timestamp_ms: row.get(5)?,
        })
    }

    fn into_sample(self) -> SinkResult<PositionSample> {
        let vehicle_id = self
            .vehicle_id
            .parse()
            .map_err(|e| SinkError::Corrupt(format!("vehicle id {:?}: {e}", self.vehicle_id)))?;
        Ok(PositionSample {
            vehicle_id,
            lat:          self.lat,
            lng:          self.lng,
            heading:      self.heading,
            progress:     self.progress,
            timestamp_ms: self.timestamp_ms,
        })
    }
}
