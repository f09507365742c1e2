//! casablanca: a small fleet driving between landmarks around Casablanca.
//!
//! Vehicles get straight-line routes between random pairs of waypoints,
//! every sample goes to `output/casablanca/fleet.db` and to live
//! subscribers, and one vehicle is followed on a separate thread.
//!
//! `RUST_LOG=debug` shows per-tick summaries; `FLEET_TICK_INTERVAL_SECONDS`
//! and friends override the simulator settings.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet_core::{FleetConfig, GeoPoint, VehicleId};
use fleet_route::RouteGeometry;
use fleet_sim::FleetBuilder;
use fleet_sink::{Broadcaster, Dispatcher, SampleSink, SinkConfig, SinkObserver, SqliteStore, Tee, Topic};

// ── Constants ─────────────────────────────────────────────────────────────────

const VEHICLE_COUNT: usize = 6;
const SEED:          u64   = 7;
const SPEED_KMH:     f64   = 40.0;
const ROUTE_STEPS:   usize = 10;
const NEARBY_KM:     f64   = 5.0;
const OUTPUT_DIR:    &str  = "output/casablanca";

/// Depot near Berrechid, then five points across the city.
const WAYPOINTS: [(f64, f64); 6] = [
    (33.39123, -7.94762),
    (33.55292, -7.62379),
    (33.54945, -7.64413),
    (33.56277, -7.66815),
    (33.55187, -7.69003),
    (33.53779, -7.66268),
];

fn random_route(rng: &mut SmallRng) -> Result<RouteGeometry> {
    let from = rng.gen_range(0..WAYPOINTS.len());
    let to = (from + rng.gen_range(1..WAYPOINTS.len())) % WAYPOINTS.len();
    let (a, b) = (WAYPOINTS[from], WAYPOINTS[to]);
    Ok(RouteGeometry::straight_line(
        GeoPoint::new(a.0, a.1),
        GeoPoint::new(b.0, b.1),
        ROUTE_STEPS,
    )?)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== casablanca: fleet simulation ===");
    println!("Vehicles: {VEHICLE_COUNT}  |  Speed: {SPEED_KMH} km/h  |  Seed: {SEED}");
    println!();

    // 1. Config: defaults, environment overrides, clock starting now.
    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as i64;
    let config = FleetConfig { start_unix_ms: now_ms, ..FleetConfig::default() }
        .with_env()
        .context("reading fleet settings from the environment")?;
    println!(
        "Tick interval: {} s  |  workers: {}",
        config.tick_interval_seconds,
        config.worker_pool_size.map_or_else(|| "all cores".to_owned(), |n| n.to_string()),
    );

    // 2. Sinks: SQLite first, then live subscribers.
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let db_path = Path::new(OUTPUT_DIR).join("fleet.db");
    let store = SqliteStore::open(&db_path)?;
    store.reset()?;
    let hub = Arc::new(Broadcaster::new());
    let mut obs = SinkObserver::new(Dispatcher::new(Tee::new(store, Arc::clone(&hub)), SinkConfig::default())?);

    // 3. Fleet.  Half the vehicles are assigned directly, half through the
    //    handle the way another thread would.
    let mut fleet = FleetBuilder::new(config).build()?;
    let handle = fleet.handle();
    let mut rng = SmallRng::seed_from_u64(SEED);

    let mut followed = None;
    for i in 0..VEHICLE_COUNT {
        let route = random_route(&mut rng)?;
        if i % 2 == 0 {
            let id = VehicleId::new_v4();
            fleet.assign(id, route, SPEED_KMH)?;
            followed.get_or_insert(id);
        } else {
            handle.assign(route, SPEED_KMH)?;
        }
    }
    let followed = followed.context("no vehicle assigned")?;

    // 4. Follow one vehicle until its subscription closes.
    let subscription = hub.subscribe(Topic::Vehicle(followed));
    let follower = thread::Builder::new()
        .name("follower".to_owned())
        .spawn(move || {
            let mut seen = 0usize;
            while let Some(sample) = subscription.recv() {
                seen += 1;
                if sample.progress >= 100.0 || seen % 10 == 1 {
                    info!(
                        vehicle  = %sample.vehicle_id.short(),
                        lat      = sample.lat,
                        lng      = sample.lng,
                        heading  = sample.heading,
                        progress = sample.progress,
                        "followed vehicle"
                    );
                }
            }
            seen
        })?;

    // 5. Run until every vehicle has arrived.
    let t0 = Instant::now();
    fleet.run(&mut obs)?;
    let elapsed = t0.elapsed();

    if let Some(e) = obs.take_error() {
        eprintln!("sink error: {e}");
    }

    // 6. Summary.
    let stats = fleet.stats();
    let (days, hours, minutes) = fleet.clock.elapsed_dhm();
    println!();
    println!("Simulation complete in {:.3} s", elapsed.as_secs_f64());
    println!(
        "  ticks: {}  |  simulated: {days}d {hours:02}h {minutes:02}m  |  moving {} idle {} finished {}",
        stats.tick.0, stats.moving, stats.idle, stats.finished,
    );
    let delivery = obs.dispatcher().stats();
    println!(
        "  sink: {} delivered, {} retried, {} dropped",
        delivery.delivered, delivery.retried, delivery.dropped,
    );
    println!();

    let store = &obs.dispatcher().sink().first;
    println!("{:<10} {:>10} {:>10} {:>9}  {:<8}", "Vehicle", "Lat", "Lng", "Progress", "Status");
    println!("{}", "-".repeat(52));
    for sample in store.latest_positions()? {
        let status = store
            .vehicle_status(sample.vehicle_id)?
            .map_or("?", |s| s.as_str());
        println!(
            "{:<10} {:>10.5} {:>10.5} {:>8.1}%  {:<8}",
            sample.vehicle_id.short(),
            sample.lat,
            sample.lng,
            sample.progress,
            status,
        );
    }
    println!();

    let center = GeoPoint::new(WAYPOINTS[1].0, WAYPOINTS[1].1);
    let nearby = fleet.nearby(center, NEARBY_KM);
    println!("Within {NEARBY_KM} km of the city centre: {}", nearby.len());
    for hit in nearby {
        println!("  {:<10} {:>6.2} km  {}", hit.vehicle.short(), hit.distance_km, hit.status.as_str());
    }

    // The follower's subscription ends once both owners of the broadcaster
    // are gone.
    obs.into_dispatcher().close()?;
    drop(hub);
    let seen = follower.join().map_err(|_| anyhow::anyhow!("follower thread panicked"))?;
    println!();
    println!("Follower received {seen} samples; database at {}", db_path.display());

    Ok(())
}
