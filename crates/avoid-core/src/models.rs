//! Core data models for the avoidance engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geodetic position. Latitude and longitude are in radians, altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl Location {
    /// Create a location from radians and meters.
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Create a location from decimal degrees and meters.
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians(), alt_m)
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat.to_degrees()
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon.to_degrees()
    }

    /// Same horizontal position at a different altitude.
    pub fn with_alt(self, alt: f64) -> Self {
        Self { alt, ..self }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.alt.is_finite()
    }
}

/// Local tangent-plane vector in meters.
///
/// `x` is east (or cross-track, right positive), `y` is north (or along-track)
/// and `z` is up. Always relative to some reference [`Location`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn magnitude_xy(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Rotate the horizontal components by `angle` radians.
    ///
    /// Rotating an east/north offset by a bearing expresses it in the track
    /// frame of that bearing (+y along track). Rotating by `-bearing` undoes it.
    pub fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            z: self.z,
        }
    }
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Snapshot of the aircraft as reported by the autopilot link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneState {
    pub location: Location,
    /// Radians, 0 = north, clockwise.
    pub heading: f64,
    /// True airspeed in m/s
    pub airspeed: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
    pub next_waypoint: Location,
    pub home_location: Location,
}

/// Side of the track a dodge waypoint is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DodgeSide {
    Left,
    Right,
}

/// Decision emitted to the autopilot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvoidanceCommand {
    /// Insert a waypoint ahead of the current one to dodge an obstacle
    InsertDodge {
        waypoint: Location,
        obstacle_id: String,
        side: DodgeSide,
    },
    /// Drop the dodge and continue to the original waypoint
    ResumeRoute { waypoint: Location },
}

/// Command envelope sent over the command link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub command_id: String,
    pub issued_at: DateTime<Utc>,
    pub command: AvoidanceCommand,
}

impl Command {
    pub fn new(command: AvoidanceCommand) -> Self {
        Self {
            command_id: Uuid::new_v4().to_string(),
            issued_at: Utc::now(),
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotating_by_bearing_puts_track_on_y() {
        // Track heading east.
        let east = Offset::new(100.0, 0.0, 5.0);
        let track = east.rotated(FRAC_PI_2);
        assert!(track.x.abs() < 1e-9);
        assert!((track.y - 100.0).abs() < 1e-9);
        assert_eq!(track.z, 5.0);

        let back = track.rotated(-FRAC_PI_2);
        assert!((back.x - 100.0).abs() < 1e-9);
        assert!(back.y.abs() < 1e-9);
    }

    #[test]
    fn command_serializes_with_type_tag() {
        let cmd = AvoidanceCommand::ResumeRoute {
            waypoint: Location::new(0.5, -2.0, 100.0),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "RESUME_ROUTE");
        assert_eq!(json["waypoint"]["alt"], 100.0);
    }
}
