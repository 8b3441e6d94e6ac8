//! Scripted trajectories for simulated traffic.

use avoid_core::models::{Location, Offset};
use avoid_core::spatial::{normalize_angle, GeoFrame};
use std::f64::consts::TAU;

/// Trait for traffic trajectories.
pub trait FlightPath: Send + Sync {
    /// Position at `t` seconds from the start of the scenario.
    fn position(&self, t: f64) -> Location;

    /// Approximate heading at `t` (radians, 0 = north).
    fn heading(&self, t: f64) -> f64 {
        // Default: estimate heading from position delta
        let dt = 0.1;
        let offset = GeoFrame::WGS84.distance(&self.position(t), &self.position(t + dt), 0.0);
        if offset.magnitude_xy() < 1e-6 {
            return 0.0;
        }
        normalize_angle(offset.x.atan2(offset.y))
    }

    fn speed_mps(&self) -> f64;
}

/// Constant-speed straight line that stops at its end point.
pub struct LinearPath {
    start: Location,
    end: Location,
    speed_mps: f64,
    duration: f64,
    heading: f64,
}

impl LinearPath {
    pub fn new(start: Location, end: Location, speed_mps: f64) -> Self {
        let frame = GeoFrame::WGS84;
        let distance_m = frame.horizontal_distance(&start, &end);
        let duration = if speed_mps > 0.0 {
            distance_m / speed_mps
        } else {
            0.0
        };

        Self {
            start,
            end,
            speed_mps,
            duration,
            heading: frame.bearing(&start, &end),
        }
    }

    /// Seconds to reach the end point.
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl FlightPath for LinearPath {
    fn position(&self, t: f64) -> Location {
        // Clamp progress to [0, 1]
        let progress = if self.duration > 0.0 {
            (t / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Location::new(
            self.start.lat + progress * (self.end.lat - self.start.lat),
            self.start.lon + progress * (self.end.lon - self.start.lon),
            self.start.alt + progress * (self.end.alt - self.start.alt),
        )
    }

    fn heading(&self, _t: f64) -> f64 {
        self.heading
    }

    fn speed_mps(&self) -> f64 {
        self.speed_mps
    }
}

/// Constant-speed orbit around a center point.
pub struct CircularPath {
    center: Location,
    radius_m: f64,
    speed_mps: f64,
    start_angle: f64,
    clockwise: bool,
    period: f64,
}

impl CircularPath {
    /// # Arguments
    /// * `center` - Orbit center, its altitude is the orbit altitude
    /// * `radius_m` - Radius in meters
    /// * `speed_mps` - Ground speed in m/s
    /// * `start_angle` - Starting bearing from the center in radians
    /// * `clockwise` - Direction of flight seen from above
    pub fn new(
        center: Location,
        radius_m: f64,
        speed_mps: f64,
        start_angle: f64,
        clockwise: bool,
    ) -> Self {
        let period = if speed_mps > 0.0 {
            TAU * radius_m / speed_mps
        } else {
            f64::INFINITY
        };

        Self {
            center,
            radius_m,
            speed_mps,
            start_angle,
            clockwise,
            period,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }
}

impl FlightPath for CircularPath {
    fn position(&self, t: f64) -> Location {
        let swept = TAU * t / self.period;
        let angle = if self.clockwise {
            self.start_angle + swept
        } else {
            self.start_angle - swept
        };

        let offset = Offset::new(self.radius_m * angle.sin(), self.radius_m * angle.cos(), 0.0);
        GeoFrame::WGS84.location_at(&self.center, &offset)
    }

    fn speed_mps(&self) -> f64 {
        self.speed_mps
    }
}
