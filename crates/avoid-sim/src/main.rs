//! Avoidance simulation - fly a scenario with the monitor in the loop.
//!
//! The simulated plane takes off from home, climbs to cruise altitude and
//! flies a northbound route while the monitor watches for obstacles. Every
//! command the monitor sends is printed as one JSON line on stdout.
//!
//! Usage:
//!   cargo run -p avoid-sim -- --scenario tower

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::time;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avoid_core::models::Location;
use avoid_monitor::{AvoidanceMonitor, MonitorConfig, ObstacleRegistry, Plane};
use avoid_sim::sim::scenarios::{
    create_clear_scenario, create_cluster_scenario, create_crossing_scenario,
    create_orbit_scenario, create_slalom_scenario, create_tower_scenario,
};
use avoid_sim::sim::{FlightPath, Scenario, SimPlane, SimPlaneConfig};
use avoid_sim::units::{self, Axis};

/// Simulation step in simulated seconds
const STEP_S: f64 = 0.1;
/// Status line cadence in simulated seconds
const STATUS_EVERY_S: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioKind {
    Clear,
    Tower,
    Cluster,
    Slalom,
    Crossing,
    Orbit,
}

/// Fly a simulated plane through an obstacle scenario
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = ScenarioKind::Tower)]
    scenario: ScenarioKind,

    /// Home latitude, decimal degrees or DMS (e.g. "38° 8' 40.56\" N")
    #[arg(long, default_value = "38.1446", value_parser = units::parse_degrees, allow_hyphen_values = true)]
    lat: f64,

    /// Home longitude, decimal degrees or DMS
    #[arg(long, default_value = "-76.4280", value_parser = units::parse_degrees, allow_hyphen_values = true)]
    lon: f64,

    /// Cruise airspeed in knots
    #[arg(long, default_value_t = 40.0)]
    airspeed_kts: f64,

    /// Maximum simulated duration in seconds
    #[arg(long, default_value_t = 240.0)]
    duration: f64,

    /// Simulated seconds per wall-clock second
    #[arg(long, default_value_t = 10.0)]
    time_scale: f64,

    /// Drop the telemetry link for this many simulated seconds mid-flight
    #[arg(long, default_value_t = 0.0)]
    link_dropout: f64,
}

fn build_scenario(kind: ScenarioKind, home: Location, airspeed_mps: f64) -> Scenario {
    match kind {
        ScenarioKind::Clear => create_clear_scenario(home),
        ScenarioKind::Tower => create_tower_scenario(home),
        ScenarioKind::Cluster => create_cluster_scenario(home),
        ScenarioKind::Slalom => create_slalom_scenario(home),
        ScenarioKind::Crossing => create_crossing_scenario(home, airspeed_mps),
        ScenarioKind::Orbit => create_orbit_scenario(home),
    }
}

fn scaled(interval: Duration, time_scale: f64) -> Duration {
    Duration::from_secs_f64(interval.as_secs_f64() / time_scale)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("avoid_sim=info".parse()?)
                .add_directive("avoid_monitor=info".parse()?),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.time_scale > 0.0, "--time-scale must be positive");
    anyhow::ensure!(args.airspeed_kts > 0.0, "--airspeed-kts must be positive");

    let home = Location::from_degrees(args.lat, args.lon, 0.0);
    let airspeed_mps = units::meters_per_second(args.airspeed_kts);
    let scenario = build_scenario(args.scenario, home, airspeed_mps);

    tracing::info!(
        "Scenario {}: home {} {}, {} obstacles, {} traffic",
        scenario.name,
        units::rad_to_dms(home.lat, Axis::Lat),
        units::rad_to_dms(home.lon, Axis::Lon),
        scenario.obstacles.len(),
        scenario.traffic.len()
    );

    let mut config = MonitorConfig::from_env();
    config.arming_interval = scaled(config.arming_interval, args.time_scale);
    config.armed_interval = scaled(config.armed_interval, args.time_scale);

    let registry = Arc::new(ObstacleRegistry::new(config.rules.clone()));
    for spec in &scenario.obstacles {
        registry
            .register_static(&spec.id, spec.location, spec.radius_m, spec.height_m)
            .with_context(|| format!("registering obstacle {}", spec.id))?;
    }
    let mut feeds = Vec::with_capacity(scenario.traffic.len());
    for traffic in &scenario.traffic {
        let feed = registry
            .register_moving(&traffic.id, traffic.radius_m)
            .with_context(|| format!("registering traffic {}", traffic.id))?;
        feeds.push((feed, traffic.path.clone()));
    }

    let plane_config = SimPlaneConfig {
        airspeed_mps,
        performance: config.rules.performance,
        ..SimPlaneConfig::default()
    };
    let plane = Arc::new(SimPlane::new(
        scenario.home,
        scenario.heading,
        scenario.route.clone(),
        plane_config,
    ));
    let link: Arc<dyn Plane> = plane.clone();
    let monitor = AvoidanceMonitor::spawn(link, registry.clone(), config);

    let dropout_start = args.duration / 3.0;
    let dropout_end = dropout_start + args.link_dropout;

    let mut ticker = time::interval(scaled(Duration::from_secs_f64(STEP_S), args.time_scale));
    let mut t = 0.0;
    let mut printed = 0;
    let mut next_status = 0.0;

    while t < args.duration && !plane.is_finished() {
        ticker.tick().await;

        plane.step(STEP_S);
        t += STEP_S;
        for (feed, path) in &feeds {
            feed.publish(path.position(t));
        }

        if args.link_dropout > 0.0 {
            plane.set_connected(!(dropout_start..dropout_end).contains(&t));
        }

        let commands = plane.commands();
        for command in &commands[printed..] {
            println!("{}", serde_json::to_string(command)?);
        }
        printed = commands.len();

        if t >= next_status {
            let location = plane.location();
            tracing::info!(
                "t={:5.1}s {} {} alt {:.0} ft hdg {:03.0}° monitor {:?}",
                t,
                units::rad_to_dms(location.lat, Axis::Lat),
                units::rad_to_dms(location.lon, Axis::Lon),
                units::feet(location.alt - scenario.home.alt),
                units::rad_to_deg(plane.heading()),
                monitor.state()
            );
            next_status += STATUS_EVERY_S;
        }
    }

    monitor.close();
    monitor.join().await;

    tracing::info!(
        "Simulation finished after {:.1}s: {} commands, monitor {:?}, route {}",
        t,
        printed,
        monitor.state(),
        if plane.is_finished() { "complete" } else { "incomplete" }
    );

    Ok(())
}
