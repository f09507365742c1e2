//! CSV sink backend.
//!
//! Creates three files in the configured output directory:
//! - `vehicles.csv`
//! - `position_samples.csv`
//! - `status_changes.csv`

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use csv::Writer;
use fleet_core::{VehicleId, VehicleStatus};
use fleet_motion::PositionSample;

use crate::{RouteRow, SampleSink, SinkResult, VehicleRow};

const VEHICLES_FILE: &str = "vehicles.csv";
const SAMPLES_FILE: &str = "position_samples.csv";
const STATUS_FILE: &str = "status_changes.csv";

struct Files {
    vehicles: Writer<File>,
    samples:  Writer<File>,
    statuses: Writer<File>,
}

impl Files {
    /// Create (truncating) the three files and write the header rows.
    fn create(dir: &Path) -> SinkResult<Self> {
        let mut vehicles = Writer::from_path(dir.join(VEHICLES_FILE))?;
        vehicles.write_record([
            "vehicle_id", "start_lat", "start_lng", "end_lat", "end_lng",
            "speed_kmh", "distance_m", "duration_s", "created_at_ms",
        ])?;

        let mut samples = Writer::from_path(dir.join(SAMPLES_FILE))?;
        samples.write_record(["vehicle_id", "lat", "lng", "heading", "progress", "timestamp_ms"])?;

        let mut statuses = Writer::from_path(dir.join(STATUS_FILE))?;
        statuses.write_record(["vehicle_id", "status", "at_ms"])?;

        Ok(Self { vehicles, samples, statuses })
    }
}

/// Appends simulator output to CSV files.
///
/// The CSV files have no random access, so `reset` truncates them back to
/// their headers.
pub struct CsvSink {
    dir:   PathBuf,
    files: Mutex<Files>,
}

impl CsvSink {
    /// Open (or create) the files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> SinkResult<Self> {
        Ok(Self {
            dir:   dir.to_path_buf(),
            files: Mutex::new(Files::create(dir)?),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Files> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSink for CsvSink {
    fn register_vehicle(&self, vehicle: &VehicleRow, route: &RouteRow, _: Duration) -> SinkResult<()> {
        self.lock().vehicles.write_record(&[
            vehicle.id.to_string(),
            vehicle.start.lat.to_string(),
            vehicle.start.lng.to_string(),
            vehicle.end.lat.to_string(),
            vehicle.end.lng.to_string(),
            vehicle.speed_kmh.to_string(),
            route.distance_m.to_string(),
            route.duration_s.to_string(),
            vehicle.created_at_ms.to_string(),
        ])?;
        Ok(())
    }

    fn write_sample(&self, sample: &PositionSample, _timeout: Duration) -> SinkResult<()> {
        self.lock().samples.write_record(&[
            sample.vehicle_id.to_string(),
            sample.lat.to_string(),
            sample.lng.to_string(),
            sample.heading.to_string(),
            sample.progress.to_string(),
            sample.timestamp_ms.to_string(),
        ])?;
        Ok(())
    }

    fn update_status(&self, vehicle: VehicleId, status: VehicleStatus, at_ms: i64, _: Duration) -> SinkResult<()> {
        self.lock().statuses.write_record(&[
            vehicle.to_string(),
            status.as_str().to_owned(),
            at_ms.to_string(),
        ])?;
        Ok(())
    }

    fn reset(&self) -> SinkResult<()> {
        let mut files = self.lock();
        // Buffered rows would otherwise land in the truncated files.
        files.vehicles.flush()?;
        files.samples.flush()?;
        files.statuses.flush()?;
        *files = Files::create(&self.dir)?;
        Ok(())
    }

    fn flush(&self) -> SinkResult<()> {
        let mut files = self.lock();
        files.vehicles.flush()?;
        files.samples.flush()?;
        files.statuses.flush()?;
        Ok(())
    }
}
