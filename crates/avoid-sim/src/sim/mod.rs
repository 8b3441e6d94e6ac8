//! Flight simulation for the avoidance monitor.

pub mod paths;
pub mod plane;
pub mod scenarios;

pub use paths::{CircularPath, FlightPath, LinearPath};
pub use plane::{SimPlane, SimPlaneConfig};
pub use scenarios::{Scenario, StaticSpec, TrafficSpec};
