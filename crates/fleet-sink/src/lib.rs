//! `fleet-sink`: delivery of simulator output to stores and subscribers.
//!
//! Backends implement [`SampleSink`]:
//!
//! | Feature   | Backend           | Destination                                            |
//! |-----------|-------------------|--------------------------------------------------------|
//! | *(none)*  | `CsvSink`         | `vehicles.csv`, `position_samples.csv`, `status_changes.csv` |
//! | *(none)*  | `Broadcaster`     | In-process subscribers, per vehicle or fan-out         |
//! | *(none)*  | `RecordingSink`   | Memory (tests, dry runs)                               |
//! | `sqlite`  | `SqliteStore`     | `vehicles`, `routes`, `vehicle_positions` tables       |
//!
//! [`Tee`] chains two backends (store, then broadcast).  A [`Dispatcher`]
//! runs the writes on shard threads with per-vehicle ordering and bounded
//! exponential-backoff retry; [`SinkObserver`] plugs it into the simulator
//! as a `fleet_sim::FleetObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_sink::{Broadcaster, Dispatcher, SinkConfig, SinkObserver, SqliteStore, Tee, Topic};
//!
//! let sink = Tee::new(SqliteStore::open(Path::new("fleet.db"))?, Arc::new(Broadcaster::new()));
//! let mut obs = SinkObserver::new(Dispatcher::new(sink, SinkConfig::default())?);
//! fleet.run(&mut obs)?;
//! obs.take_error().map(|e| eprintln!("sink error: {e}"));
//! ```

pub mod broadcast;
pub mod config;
pub mod csv;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod observer;
pub mod row;
pub mod sink;
pub mod tee;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use self::csv::CsvSink;
pub use broadcast::{Broadcaster, Closed, Subscription, Topic};
pub use config::SinkConfig;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::{SinkError, SinkResult};
pub use memory::{Recorded, RecordingSink};
pub use observer::SinkObserver;
pub use row::{RouteRow, VehicleRow};
pub use sink::SampleSink;
pub use tee::Tee;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
