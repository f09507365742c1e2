//! Integration tests for fleet-sink.

#[cfg(test)]
mod helpers {
    use fleet_core::{FleetConfig, GeoPoint, VehicleId};
    use fleet_motion::{PositionSample, PositionSampler};
    use fleet_route::RouteGeometry;
    use fleet_sim::{Fleet, FleetBuilder};

    use crate::SinkConfig;

    pub fn vid(n: u128) -> VehicleId {
        VehicleId::from_u128(n)
    }

    pub fn sample(vehicle: VehicleId, timestamp_ms: i64) -> PositionSample {
        PositionSample {
            vehicle_id: vehicle,
            lat:        33.5,
            lng:        -7.6,
            heading:    90.0,
            progress:   timestamp_ms as f64 / 1000.0,
            timestamp_ms,
        }
    }

    /// Retries fast enough for tests.
    pub fn fast_config(shards: usize) -> SinkConfig {
        SinkConfig {
            shards,
            max_attempts:       3,
            initial_backoff_ms: 1,
            max_backoff_ms:     4,
            write_timeout_ms:   100,
            queue_capacity:     1_000,
        }
    }

    /// ~1.1 km due north.
    pub fn short_route(from: GeoPoint) -> RouteGeometry {
        RouteGeometry::new(vec![from, GeoPoint::new(from.lat + 0.01, from.lng)]).unwrap()
    }

    /// Decoded coordinates go through JSON text, so compare within a tolerance.
    pub fn assert_same_points(a: &[GeoPoint], b: &[GeoPoint]) {
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b) {
            assert!((p.lat - q.lat).abs() < 1e-9 && (p.lng - q.lng).abs() < 1e-9, "{p:?} != {q:?}");
        }
    }

    pub fn fleet() -> Fleet<PositionSampler> {
        let config = FleetConfig {
            tick_interval_seconds: 10.0,
            worker_pool_size:      Some(2),
            ..FleetConfig::default()
        };
        FleetBuilder::new(config).build().unwrap()
    }
}

// ── SinkConfig ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod config_tests {
    use std::time::Duration;

    use crate::SinkConfig;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = SinkConfig { initial_backoff_ms: 50, max_backoff_ms: 300, ..SinkConfig::default() };
        assert_eq!(config.backoff(1), Duration::from_millis(50));
        assert_eq!(config.backoff(2), Duration::from_millis(100));
        assert_eq!(config.backoff(3), Duration::from_millis(200));
        assert_eq!(config.backoff(4), Duration::from_millis(300));
        assert_eq!(config.backoff(80), Duration::from_millis(300));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: SinkConfig = serde_json::from_str(r#"{ "shards": 8 }"#).unwrap();
        assert_eq!(config.shards, 8);
        assert_eq!(config.max_attempts, SinkConfig::default().max_attempts);
        assert_eq!(config.write_timeout(), Duration::from_millis(5_000));
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod dispatcher_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::helpers::*;
    use crate::{Dispatcher, RecordingSink, SinkConfig, SinkError};

    #[test]
    fn per_vehicle_order_preserved_across_shards() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(3)).unwrap();
        for ts in 1..=100 {
            for v in 1..=5 {
                dispatcher.send_sample(sample(vid(v), ts)).unwrap();
            }
        }
        dispatcher.drain().unwrap();

        let rec = sink.snapshot();
        assert_eq!(rec.samples.len(), 500);
        for v in 1..=5 {
            let stamps: Vec<i64> = rec.samples_for(vid(v)).iter().map(|s| s.timestamp_ms).collect();
            assert_eq!(stamps, (1..=100).collect::<Vec<_>>());
        }
        assert_eq!(dispatcher.stats().delivered, 500);
    }

    #[test]
    fn transient_failures_are_retried() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(1)).unwrap();
        sink.fail_next(2);
        dispatcher.send_sample(sample(vid(1), 1)).unwrap();
        dispatcher.drain().unwrap();

        assert_eq!(sink.snapshot().samples.len(), 1);
        assert_eq!(sink.attempts(), 3);
        let stats = dispatcher.stats();
        assert_eq!((stats.delivered, stats.retried, stats.dropped), (1, 2, 0));
    }

    #[test]
    fn exhausted_retries_drop_the_write_and_move_on() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(1)).unwrap();
        sink.fail_next(3);
        dispatcher.send_sample(sample(vid(1), 1)).unwrap();
        dispatcher.send_sample(sample(vid(1), 2)).unwrap();
        dispatcher.drain().unwrap();

        let rec = sink.snapshot();
        assert_eq!(rec.samples.len(), 1);
        assert_eq!(rec.samples[0].timestamp_ms, 2);
        let stats = dispatcher.stats();
        assert_eq!((stats.delivered, stats.dropped), (1, 1));
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(1)).unwrap();
        sink.reject_writes(true);
        dispatcher.send_sample(sample(vid(1), 1)).unwrap();
        dispatcher.drain().unwrap();
        assert_eq!(sink.attempts(), 1);
        assert_eq!(dispatcher.stats().dropped, 1);
        assert_eq!(dispatcher.stats().retried, 0);
    }

    #[test]
    fn retry_keeps_later_samples_behind() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(2)).unwrap();
        sink.fail_next(2);
        for ts in 1..=10 {
            dispatcher.send_sample(sample(vid(7), ts)).unwrap();
        }
        dispatcher.drain().unwrap();
        let stamps: Vec<i64> = sink.snapshot().samples.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(stamps, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn enqueue_does_not_wait_for_slow_sink() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_latency(Duration::from_millis(10));
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(1)).unwrap();

        let started = Instant::now();
        for ts in 1..=30 {
            dispatcher.send_sample(sample(vid(1), ts)).unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(150));

        dispatcher.drain().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(sink.snapshot().samples.len(), 30);
    }

    #[test]
    fn reset_waits_for_queued_writes() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(2)).unwrap();
        for ts in 1..=20 {
            dispatcher.send_sample(sample(vid(ts as u128 % 3), ts)).unwrap();
        }
        dispatcher.reset().unwrap();
        let rec = sink.snapshot();
        assert!(rec.samples.is_empty());
        assert_eq!(rec.resets, 1);
        assert_eq!(dispatcher.stats().delivered, 20);
    }

    #[test]
    fn send_reset_returns_before_queued_writes_land() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_latency(Duration::from_millis(20));
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(2)).unwrap();
        for ts in 1..=10 {
            dispatcher.send_sample(sample(vid(ts as u128 % 2), ts)).unwrap();
        }

        let started = Instant::now();
        dispatcher.send_reset().unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(sink.snapshot().resets, 0);

        dispatcher.drain().unwrap();
        let rec = sink.snapshot();
        assert_eq!(rec.resets, 1);
        assert!(rec.samples.is_empty());
        assert_eq!(dispatcher.stats().delivered, 10);
    }

    #[test]
    fn writes_after_send_reset_are_kept() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_latency(Duration::from_millis(5));
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(3)).unwrap();
        for v in 1..=3 {
            dispatcher.send_sample(sample(vid(v), 1)).unwrap();
        }
        dispatcher.send_reset().unwrap();
        for v in 1..=3 {
            dispatcher.send_sample(sample(vid(v), 2)).unwrap();
        }
        dispatcher.drain().unwrap();

        let rec = sink.snapshot();
        assert_eq!(rec.resets, 1);
        assert_eq!(rec.samples.len(), 3);
        assert!(rec.samples.iter().all(|s| s.timestamp_ms == 2));
    }

    #[test]
    fn full_queue_drops_writes_instead_of_blocking() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_latency(Duration::from_millis(50));
        let config = SinkConfig { queue_capacity: 2, ..fast_config(1) };
        let dispatcher = Dispatcher::new(Arc::clone(&sink), config).unwrap();

        let started = Instant::now();
        for ts in 1..=10 {
            dispatcher.send_sample(sample(vid(1), ts)).unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(50));

        dispatcher.drain().unwrap();
        let stats = dispatcher.stats();
        assert!(stats.dropped >= 7, "dropped {}", stats.dropped);
        assert_eq!(stats.delivered + stats.dropped, 10);
        assert_eq!(sink.snapshot().samples.len() as u64, stats.delivered);
    }

    #[test]
    fn close_is_idempotent_and_rejects_new_writes() {
        let sink = Arc::new(RecordingSink::new());
        let mut dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(2)).unwrap();
        dispatcher.send_sample(sample(vid(1), 1)).unwrap();
        dispatcher.close().unwrap();
        dispatcher.close().unwrap();

        assert_eq!(sink.snapshot().samples.len(), 1);
        assert!(matches!(dispatcher.send_sample(sample(vid(1), 2)), Err(SinkError::Closed)));
    }

    #[test]
    fn drop_delivers_queued_writes() {
        let sink = Arc::new(RecordingSink::new());
        {
            let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(4)).unwrap();
            for ts in 1..=50 {
                dispatcher.send_sample(sample(vid(ts as u128), ts)).unwrap();
            }
        }
        assert_eq!(sink.snapshot().samples.len(), 50);
    }

    #[test]
    fn zero_shards_means_one() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&sink), fast_config(0)).unwrap();
        dispatcher.send_sample(sample(vid(1), 1)).unwrap();
        dispatcher.drain().unwrap();
        assert_eq!(sink.snapshot().samples.len(), 1);
    }
}

// ── Broadcaster ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod broadcast_tests {
    use std::time::Duration;

    use super::helpers::*;
    use crate::{Broadcaster, Closed, SampleSink, Topic};

    const T: Duration = Duration::from_millis(10);

    #[test]
    fn topics_filter_samples() {
        let hub = Broadcaster::new();
        let all = hub.subscribe(Topic::All);
        let one = hub.subscribe(Topic::Vehicle(vid(1)));

        assert_eq!(hub.publish(&sample(vid(1), 1)), 2);
        assert_eq!(hub.publish(&sample(vid(2), 2)), 1);

        assert_eq!(all.drain().len(), 2);
        let mine = one.drain();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].vehicle_id, vid(1));
        assert_eq!(one.topic(), Topic::Vehicle(vid(1)));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let hub = Broadcaster::new();
        let keep = hub.subscribe(Topic::All);
        let gone = hub.subscribe(Topic::All);
        drop(gone);
        assert_eq!(hub.subscriber_count(), 2);
        assert_eq!(hub.publish(&sample(vid(1), 1)), 1);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(keep.try_recv(), Ok(Some(sample(vid(1), 1))));
        assert_eq!(keep.try_recv(), Ok(None));
    }

    #[test]
    fn late_subscriber_sees_only_later_samples() {
        let hub = Broadcaster::new();
        hub.publish(&sample(vid(1), 1));
        let late = hub.subscribe(Topic::All);
        hub.publish(&sample(vid(1), 2));
        let got = late.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].timestamp_ms, 2);
    }

    #[test]
    fn removal_closes_vehicle_subscriptions() {
        let hub = Broadcaster::new();
        let one = hub.subscribe(Topic::Vehicle(vid(1)));
        let all = hub.subscribe(Topic::All);
        hub.write_sample(&sample(vid(1), 1), T).unwrap();
        hub.remove_vehicle(vid(1), T).unwrap();

        assert_eq!(one.recv_timeout(T), Ok(Some(sample(vid(1), 1))));
        assert_eq!(one.recv_timeout(T), Err(Closed));
        assert_eq!(one.recv(), None);
        hub.write_sample(&sample(vid(2), 2), T).unwrap();
        assert_eq!(all.drain().len(), 2);
    }

    #[test]
    fn reset_keeps_fan_out_subscribers() {
        let hub = Broadcaster::new();
        let _one = hub.subscribe(Topic::Vehicle(vid(1)));
        let _all = hub.subscribe(Topic::All);
        hub.reset().unwrap();
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn slow_subscriber_skips_samples_but_stays_subscribed() {
        let hub = Broadcaster::with_capacity(2);
        let slow = hub.subscribe(Topic::All);
        let delivered: Vec<usize> = (1..=5).map(|ts| hub.publish(&sample(vid(1), ts))).collect();
        assert_eq!(delivered, [1, 1, 0, 0, 0]);
        assert_eq!(hub.subscriber_count(), 1);

        let got = slow.drain();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].timestamp_ms, 2);
        assert_eq!(hub.publish(&sample(vid(1), 6)), 1);
    }
}

// ── Tee ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tee_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::helpers::*;
    use crate::{Broadcaster, RecordingSink, SampleSink, Tee, Topic};

    #[test]
    fn publishes_only_after_store_accepts() {
        let store = Arc::new(RecordingSink::new());
        let hub = Arc::new(Broadcaster::new());
        let sub = hub.subscribe(Topic::All);
        let tee = Tee::new(Arc::clone(&store), Arc::clone(&hub));

        store.fail_next(1);
        assert!(tee.write_sample(&sample(vid(1), 1), Duration::ZERO).is_err());
        assert!(sub.drain().is_empty());

        tee.write_sample(&sample(vid(1), 1), Duration::ZERO).unwrap();
        assert_eq!(sub.drain().len(), 1);
        assert_eq!(store.snapshot().samples.len(), 1);
    }
}

// ── CSV ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod csv_tests {
    use std::time::Duration;

    use fleet_core::VehicleStatus;
    use tempfile::TempDir;

    use super::helpers::*;
    use crate::{CsvSink, SampleSink};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn read(dir: &TempDir, file: &str) -> (Vec<String>, Vec<csv::StringRecord>) {
        let mut rdr = csv::Reader::from_path(dir.path().join(file)).unwrap();
        let headers = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        let rows = rdr.records().map(|r| r.unwrap()).collect();
        (headers, rows)
    }

    #[test]
    fn csv_files_created_with_headers() {
        let dir = tmp();
        let sink = CsvSink::new(dir.path()).unwrap();
        sink.flush().unwrap();

        let (h, _) = read(&dir, "position_samples.csv");
        assert_eq!(h, ["vehicle_id", "lat", "lng", "heading", "progress", "timestamp_ms"]);
        let (h, _) = read(&dir, "status_changes.csv");
        assert_eq!(h, ["vehicle_id", "status", "at_ms"]);
        let (h, _) = read(&dir, "vehicles.csv");
        assert_eq!(h.len(), 9);
    }

    #[test]
    fn csv_rows_written() {
        let dir = tmp();
        let sink = CsvSink::new(dir.path()).unwrap();
        sink.write_sample(&sample(vid(1), 1500), Duration::ZERO).unwrap();
        sink.update_status(vid(1), VehicleStatus::Finished, 2000, Duration::ZERO).unwrap();
        sink.flush().unwrap();

        let (_, rows) = read(&dir, "position_samples.csv");
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], vid(1).to_string());
        assert_eq!(&rows[0][5], "1500");

        let (_, rows) = read(&dir, "status_changes.csv");
        assert_eq!(&rows[0][1], "finished");
        assert_eq!(&rows[0][2], "2000");
    }

    #[test]
    fn csv_reset_truncates_to_headers() {
        let dir = tmp();
        let sink = CsvSink::new(dir.path()).unwrap();
        sink.write_sample(&sample(vid(1), 1), Duration::ZERO).unwrap();
        sink.flush().unwrap();
        sink.reset().unwrap();
        sink.flush().unwrap();

        let (h, rows) = read(&dir, "position_samples.csv");
        assert_eq!(h.len(), 6);
        assert!(rows.is_empty());
    }
}

// ── SinkObserver + Fleet ──────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use std::sync::Arc;

    use fleet_core::{GeoPoint, VehicleStatus};
    use fleet_route::RoutePlan;

    use super::helpers::*;
    use crate::{Broadcaster, Dispatcher, RecordingSink, SinkObserver, Tee, Topic};

    #[test]
    fn fleet_run_reaches_store_and_subscribers_in_order() {
        let store = Arc::new(RecordingSink::new());
        let hub = Arc::new(Broadcaster::new());
        let sub = hub.subscribe(Topic::Vehicle(vid(1)));
        let sink = Tee::new(Arc::clone(&store), Arc::clone(&hub));
        let mut obs = SinkObserver::new(Dispatcher::new(sink, fast_config(2)).unwrap());

        let mut fleet = fleet();
        fleet.assign(vid(1), short_route(GeoPoint::new(0.0, 0.0)), 100.0).unwrap();
        fleet.assign(vid(2), short_route(GeoPoint::new(1.0, 1.0)), 50.0).unwrap();
        fleet.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let rec = store.snapshot();
        assert_eq!(rec.vehicles.len(), 2);
        assert_eq!(rec.routes.len(), 2);
        assert!(rec.routes[0].geometry.contains("LineString"));

        // Initial sample plus one per tick until the 1.1 km route is done.
        let v1 = rec.samples_for(vid(1));
        assert_eq!(v1[0].progress, 0.0);
        assert_eq!(v1.last().unwrap().progress, 100.0);
        assert!(v1.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        assert_eq!(sub.drain(), v1);

        let finishes = rec.statuses.iter().filter(|s| s.1 == VehicleStatus::Finished).count();
        assert_eq!(finishes, 2);
        assert_eq!(obs.dispatcher().stats().dropped, 0);
    }

    #[test]
    fn stored_route_decodes_to_same_points() {
        let store = Arc::new(RecordingSink::new());
        let mut obs = SinkObserver::new(Dispatcher::new(Arc::clone(&store), fast_config(1)).unwrap());
        let route = short_route(GeoPoint::new(33.5, -7.6));
        let mut fleet = fleet();
        fleet.assign(vid(1), route.clone(), 40.0).unwrap();
        fleet.run_ticks(1, &mut obs).unwrap();
        obs.dispatcher().drain().unwrap();

        let row = store.snapshot().routes[0].clone();
        let json = format!(r#"{{ "geometry": {}, "distance": {} }}"#, row.geometry, row.distance_m);
        let decoded = RoutePlan::from_json_str(&json).unwrap().into_geometry().unwrap();
        assert_same_points(decoded.points(), route.points());
    }

    #[test]
    fn pause_and_reset_reach_the_store() {
        let store = Arc::new(RecordingSink::new());
        let mut obs = SinkObserver::new(Dispatcher::new(Arc::clone(&store), fast_config(1)).unwrap());
        let mut fleet = fleet();
        fleet.assign(vid(1), short_route(GeoPoint::new(0.0, 0.0)), 40.0).unwrap();
        fleet.run_ticks(1, &mut obs).unwrap();
        fleet.pause(vid(1)).unwrap();
        fleet.run_ticks(1, &mut obs).unwrap();
        obs.dispatcher().drain().unwrap();
        assert_eq!(store.snapshot().statuses.last().unwrap().1, VehicleStatus::Idle);

        fleet.reset();
        fleet.run_ticks(1, &mut obs).unwrap();
        obs.dispatcher().drain().unwrap();
        let rec = store.snapshot();
        assert_eq!(rec.resets, 1);
        assert!(rec.samples.is_empty());
        assert!(obs.take_error().is_none());
    }

    #[test]
    fn closed_dispatcher_error_is_kept() {
        let store = Arc::new(RecordingSink::new());
        let mut dispatcher = Dispatcher::new(Arc::clone(&store), fast_config(1)).unwrap();
        dispatcher.close().unwrap();
        let mut obs = SinkObserver::new(dispatcher);
        let mut fleet = fleet();
        fleet.assign(vid(1), short_route(GeoPoint::new(0.0, 0.0)), 40.0).unwrap();
        fleet.run_ticks(1, &mut obs).unwrap();
        assert!(obs.take_error().is_some());
        assert!(obs.take_error().is_none());
    }
}

// ── SQLite ────────────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use std::time::Duration;

    use fleet_core::{GeoPoint, VehicleStatus};
    use fleet_motion::VehicleState;
    use tempfile::TempDir;

    use super::helpers::*;
    use crate::{Dispatcher, RouteRow, SampleSink, SinkObserver, SqliteStore, VehicleRow};

    const T: Duration = Duration::from_millis(500);

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn registered(store: &SqliteStore, n: u128) -> VehicleState {
        let state = VehicleState::assign(vid(n), short_route(GeoPoint::new(33.5, -7.6)), 40.0, 1_000)
            .unwrap();
        store
            .register_vehicle(&VehicleRow::from_state(&state), &RouteRow::from_state(&state), T)
            .unwrap();
        state
    }

    #[test]
    fn sqlite_file_created() {
        let dir = tmp();
        let _s = SqliteStore::open(&dir.path().join("fleet.db")).unwrap();
        assert!(dir.path().join("fleet.db").exists());
    }

    #[test]
    fn latest_position_and_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        registered(&store, 1);
        registered(&store, 2);
        for ts in [1_000, 2_000, 3_000] {
            store.write_sample(&sample(vid(1), ts), T).unwrap();
        }
        store.write_sample(&sample(vid(2), 1_500), T).unwrap();

        assert_eq!(store.latest_position(vid(1)).unwrap().unwrap().timestamp_ms, 3_000);
        assert_eq!(store.latest_position(vid(3)).unwrap(), None);
        let latest = store.latest_positions().unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest.iter().any(|s| s.vehicle_id == vid(2) && s.timestamp_ms == 1_500));
        assert_eq!(store.positions(vid(1)).unwrap().len(), 3);

        assert_eq!(store.vehicle_status(vid(1)).unwrap(), Some(VehicleStatus::Moving));
        store.update_status(vid(1), VehicleStatus::Finished, 4_000, T).unwrap();
        assert_eq!(store.vehicle_status(vid(1)).unwrap(), Some(VehicleStatus::Finished));
        assert_eq!(store.vehicle_status(vid(9)).unwrap(), None);
    }

    #[test]
    fn route_geometry_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let state = registered(&store, 1);
        let route = store.route_geometry(vid(1)).unwrap().unwrap();
        assert_same_points(route.points(), state.route().points());
        assert!((route.total_distance_m() - state.route().total_distance_m()).abs() < 1e-6);
    }

    #[test]
    fn status_check_constraint_rejects_unknown_values() {
        let dir = tmp();
        let path = dir.path().join("fleet.db");
        let store = SqliteStore::open(&path).unwrap();
        registered(&store, 1);
        drop(store);

        let conn = rusqlite::Connection::open(&path).unwrap();
        let result = conn.execute("UPDATE vehicles SET status = 'parked'", []);
        assert!(result.is_err());
    }

    #[test]
    fn reset_deletes_everything() {
        let store = SqliteStore::open_in_memory().unwrap();
        registered(&store, 1);
        store.write_sample(&sample(vid(1), 1_000), T).unwrap();
        store.reset().unwrap();
        assert_eq!(store.vehicle_count().unwrap(), 0);
        assert!(store.latest_positions().unwrap().is_empty());
        assert!(store.route_geometry(vid(1)).unwrap().is_none());
    }

    #[test]
    fn integration_sqlite() {
        let dir = tmp();
        let store = SqliteStore::open(&dir.path().join("fleet.db")).unwrap();
        let mut obs = SinkObserver::new(Dispatcher::new(store, fast_config(2)).unwrap());

        let mut fleet = fleet();
        fleet.assign(vid(1), short_route(GeoPoint::new(33.5, -7.6)), 100.0).unwrap();
        fleet.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let store = obs.dispatcher().sink();
        assert_eq!(obs.dispatcher().stats().dropped, 0);
        assert_eq!(store.vehicle_status(vid(1)).unwrap(), Some(VehicleStatus::Finished));
        let latest = store.latest_position(vid(1)).unwrap().unwrap();
        assert_eq!(latest.progress, 100.0);
        // Initial sample plus one per tick.
        let ticks = fleet.clock.current_tick.0 as usize;
        assert_eq!(store.positions(vid(1)).unwrap().len(), ticks + 1);
    }

    #[test]
    fn reassigned_id_updates_its_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut obs = SinkObserver::new(Dispatcher::new(store, fast_config(1)).unwrap());
        let mut fleet = fleet();
        fleet.assign(vid(7), short_route(GeoPoint::new(33.5, -7.6)), 100.0).unwrap();
        fleet.run(&mut obs).unwrap();

        fleet.remove(vid(7)).unwrap();
        let second = short_route(GeoPoint::new(34.0, -7.0));
        fleet.assign(vid(7), second.clone(), 40.0).unwrap();
        fleet.run_ticks(1, &mut obs).unwrap();
        obs.dispatcher().drain().unwrap();
        assert!(obs.take_error().is_none());
        assert_eq!(obs.dispatcher().stats().dropped, 0);

        let store = obs.dispatcher().sink();
        assert_eq!(store.vehicle_count().unwrap(), 1);
        assert_eq!(store.vehicle_status(vid(7)).unwrap(), Some(VehicleStatus::Moving));
        let route = store.route_geometry(vid(7)).unwrap().unwrap();
        assert_same_points(route.points(), second.points());
    }
}
