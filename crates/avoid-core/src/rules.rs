//! Tunable constants for the avoidance engine.

use crate::spatial::GeoFrame;
use crate::turn::TurnPerformance;
use serde::{Deserialize, Serialize};

/// Default clearance kept from static obstacles (meters).
pub const AVOID_DISTANCE_STATIC_M: f64 = 15.0;
/// Default clearance kept from moving obstacles (meters).
pub const AVOID_DISTANCE_MOVING_M: f64 = 30.0;
/// Default extra lateral clearance added to a dodge waypoint (meters).
pub const DODGE_MARGIN_M: f64 = 10.0;
/// Default extra clearance the original route needs before a dodge ends (meters).
pub const RESUME_MARGIN_M: f64 = 5.0;

/// Configuration for avoidance geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvoidanceRules {
    /// Ellipsoid used for the flat-earth approximation
    #[serde(default)]
    pub frame: GeoFrame,
    /// Banked-turn performance of the airframe
    #[serde(default)]
    pub performance: TurnPerformance,
    /// Safety buffer around static obstacles in meters
    pub static_buffer_m: f64,
    /// Safety buffer around moving obstacles in meters
    pub moving_buffer_m: f64,
    /// Lateral margin beyond the avoid radius for dodge waypoints in meters
    pub dodge_margin_m: f64,
    /// Extra buffer the original route must clear before resuming, so a
    /// resumed route is not immediately blocked again
    #[serde(default = "default_resume_margin")]
    pub resume_margin_m: f64,
}

fn default_resume_margin() -> f64 {
    RESUME_MARGIN_M
}

impl Default for AvoidanceRules {
    fn default() -> Self {
        Self {
            frame: GeoFrame::WGS84,
            performance: TurnPerformance::default(),
            static_buffer_m: AVOID_DISTANCE_STATIC_M,
            moving_buffer_m: AVOID_DISTANCE_MOVING_M,
            dodge_margin_m: DODGE_MARGIN_M,
            resume_margin_m: RESUME_MARGIN_M,
        }
    }
}
