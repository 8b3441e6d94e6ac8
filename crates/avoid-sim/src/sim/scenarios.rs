//! Pre-defined avoidance scenarios.
//!
//! Every scenario flies the same northbound route from a home point at the
//! given coordinates: climb out, cruise at 100 m and finish 3 km north.

use std::f64::consts::PI;
use std::sync::Arc;

use avoid_core::models::{Location, Offset};
use avoid_core::spatial::GeoFrame;

use super::paths::{CircularPath, LinearPath};
use super::FlightPath;

const CRUISE_ALT_M: f64 = 100.0;
const ROUTE_LENGTH_M: f64 = 3000.0;

/// Fixed obstacle to register before the flight.
#[derive(Debug, Clone)]
pub struct StaticSpec {
    pub id: String,
    pub location: Location,
    pub radius_m: f64,
    pub height_m: f64,
}

/// Traffic that reports its position along a scripted path.
pub struct TrafficSpec {
    pub id: String,
    pub radius_m: f64,
    pub path: Arc<dyn FlightPath>,
}

/// A named scenario: home, route and everything in the way.
pub struct Scenario {
    pub name: String,
    pub home: Location,
    /// Initial heading in radians
    pub heading: f64,
    pub route: Vec<Location>,
    pub obstacles: Vec<StaticSpec>,
    pub traffic: Vec<TrafficSpec>,
}

fn local(home: &Location, x: f64, y: f64, alt: f64) -> Location {
    GeoFrame::WGS84.location_at(home, &Offset::new(x, y, alt))
}

fn base(name: &str, home: Location) -> Scenario {
    Scenario {
        name: name.to_string(),
        home,
        heading: 0.0,
        route: vec![
            local(&home, 0.0, ROUTE_LENGTH_M / 2.0, CRUISE_ALT_M),
            local(&home, 0.0, ROUTE_LENGTH_M, CRUISE_ALT_M),
        ],
        obstacles: Vec::new(),
        traffic: Vec::new(),
    }
}

/// Route with nothing on it.
pub fn create_clear_scenario(home: Location) -> Scenario {
    let mut scenario = base("clear", home);
    scenario.obstacles.push(StaticSpec {
        id: "mast-east".to_string(),
        location: local(&home, 250.0, 1200.0, 60.0),
        radius_m: 10.0,
        height_m: 120.0,
    });
    scenario
}

/// Single tower slightly right of the route.
pub fn create_tower_scenario(home: Location) -> Scenario {
    let mut scenario = base("tower", home);
    scenario.obstacles.push(StaticSpec {
        id: "tower".to_string(),
        location: local(&home, 15.0, 1100.0, 75.0),
        radius_m: 20.0,
        height_m: 150.0,
    });
    scenario
}

/// Two towers close enough that their avoid areas merge.
pub fn create_cluster_scenario(home: Location) -> Scenario {
    let mut scenario = base("cluster", home);
    scenario.obstacles.push(StaticSpec {
        id: "tower-a".to_string(),
        location: local(&home, 10.0, 1100.0, 75.0),
        radius_m: 20.0,
        height_m: 150.0,
    });
    scenario.obstacles.push(StaticSpec {
        id: "tower-b".to_string(),
        location: local(&home, -30.0, 1120.0, 75.0),
        radius_m: 15.0,
        height_m: 150.0,
    });
    scenario
}

/// Two towers on the same leg, far enough apart to be dodged one at a time.
pub fn create_slalom_scenario(home: Location) -> Scenario {
    let mut scenario = base("slalom", home);
    scenario.obstacles.push(StaticSpec {
        id: "t1".to_string(),
        location: local(&home, 15.0, 600.0, 75.0),
        radius_m: 20.0,
        height_m: 150.0,
    });
    scenario.obstacles.push(StaticSpec {
        id: "t2".to_string(),
        location: local(&home, -5.0, 1200.0, 75.0),
        radius_m: 20.0,
        height_m: 150.0,
    });
    scenario
}

/// Traffic crossing the route west to east, timed to meet the plane.
///
/// `airspeed_mps` is the simulated plane's speed, used to time the crossing.
pub fn create_crossing_scenario(home: Location, airspeed_mps: f64) -> Scenario {
    let mut scenario = base("crossing", home);
    let crossing_y = 1400.0;
    let traffic_speed = 12.0;
    let time_to_crossing = crossing_y / airspeed_mps.max(1.0);
    let start_x = -traffic_speed * time_to_crossing;

    let path = LinearPath::new(
        local(&home, start_x, crossing_y, CRUISE_ALT_M),
        local(&home, -start_x, crossing_y, CRUISE_ALT_M),
        traffic_speed,
    );
    scenario.traffic.push(TrafficSpec {
        id: "traffic-1".to_string(),
        radius_m: 8.0,
        path: Arc::new(path),
    });
    scenario
}

/// Traffic orbiting over the route.
pub fn create_orbit_scenario(home: Location) -> Scenario {
    let mut scenario = base("orbit", home);
    let path = CircularPath::new(local(&home, 0.0, 1800.0, CRUISE_ALT_M), 150.0, 15.0, PI, true);
    scenario.traffic.push(TrafficSpec {
        id: "orbiter".to_string(),
        radius_m: 8.0,
        path: Arc::new(path),
    });
    scenario
}
