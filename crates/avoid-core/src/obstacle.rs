//! Obstacle shapes and the clearance they demand at a given altitude.
//!
//! Static obstacles are vertical cylinders whose recorded altitude is the
//! vertical center. Moving obstacles are spheres positioned at their most
//! recent feed sample.

use crate::models::Location;
use crate::rules::AvoidanceRules;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an obstacle is rejected at registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObstacleError {
    #[error("obstacle radius must be positive, got {0}")]
    NonPositiveRadius(f64),
    #[error("obstacle height must not be negative, got {0}")]
    NegativeHeight(f64),
    #[error("safety buffer must not be negative, got {0}")]
    NegativeBuffer(f64),
    #[error("obstacle {0} is not finite")]
    NonFinite(&'static str),
}

/// Fixed structure modeled as a vertical cylinder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticObstacle {
    location: Location,
    radius_m: f64,
    height_m: f64,
    buffer_m: f64,
}

impl StaticObstacle {
    pub fn new(
        location: Location,
        radius_m: f64,
        height_m: f64,
        buffer_m: f64,
    ) -> Result<Self, ObstacleError> {
        if !location.is_finite() {
            return Err(ObstacleError::NonFinite("location"));
        }
        validate_radius(radius_m)?;
        if !height_m.is_finite() {
            return Err(ObstacleError::NonFinite("height"));
        }
        if height_m < 0.0 {
            return Err(ObstacleError::NegativeHeight(height_m));
        }
        validate_buffer(buffer_m)?;
        Ok(Self {
            location,
            radius_m,
            height_m,
            buffer_m,
        })
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn height_m(&self) -> f64 {
        self.height_m
    }

    pub fn buffer_m(&self) -> f64 {
        self.buffer_m
    }

    pub fn cross_sectional_radius(&self, alt: f64) -> f64 {
        if (alt - self.location.alt).abs() < self.height_m / 2.0 {
            self.radius_m
        } else {
            0.0
        }
    }

    /// Full buffer alongside the cylinder, then a circular fillet that blends
    /// the buffer to zero over one buffer length above the top and below the
    /// bottom.
    pub fn avoid_radius(&self, alt: f64) -> f64 {
        let half_height = self.height_m / 2.0;
        let dz = (alt - self.location.alt).abs();

        if dz <= half_height {
            return self.radius_m + self.buffer_m;
        }
        if dz < half_height + self.buffer_m {
            let over = dz - half_height;
            return self.radius_m + (self.buffer_m.powi(2) - over.powi(2)).max(0.0).sqrt();
        }
        0.0
    }
}

/// Traffic modeled as a sphere at its latest reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingObstacle {
    position: Location,
    radius_m: f64,
    buffer_m: f64,
}

impl MovingObstacle {
    pub fn new(position: Location, radius_m: f64, buffer_m: f64) -> Result<Self, ObstacleError> {
        if !position.is_finite() {
            return Err(ObstacleError::NonFinite("position"));
        }
        validate_radius(radius_m)?;
        validate_buffer(buffer_m)?;
        Ok(Self {
            position,
            radius_m,
            buffer_m,
        })
    }

    pub fn position(&self) -> Location {
        self.position
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn buffer_m(&self) -> f64 {
        self.buffer_m
    }

    pub fn cross_sectional_radius(&self, alt: f64) -> f64 {
        sphere_section(self.radius_m, alt - self.position.alt)
    }

    pub fn avoid_radius(&self, alt: f64) -> f64 {
        sphere_section(self.radius_m + self.buffer_m, alt - self.position.alt)
    }
}

/// Horizontal radius of a sphere's slice `dz` away from its center.
fn sphere_section(radius: f64, dz: f64) -> f64 {
    if dz.abs() < radius {
        (radius * radius - dz * dz).sqrt()
    } else {
        0.0
    }
}

fn validate_radius(radius_m: f64) -> Result<(), ObstacleError> {
    if !radius_m.is_finite() {
        return Err(ObstacleError::NonFinite("radius"));
    }
    if radius_m <= 0.0 {
        return Err(ObstacleError::NonPositiveRadius(radius_m));
    }
    Ok(())
}

fn validate_buffer(buffer_m: f64) -> Result<(), ObstacleError> {
    if !buffer_m.is_finite() {
        return Err(ObstacleError::NonFinite("buffer"));
    }
    if buffer_m < 0.0 {
        return Err(ObstacleError::NegativeBuffer(buffer_m));
    }
    Ok(())
}

/// Any obstacle the engine avoids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Obstacle {
    Static(StaticObstacle),
    Moving(MovingObstacle),
}

impl Obstacle {
    /// Static cylinder using the configured static buffer.
    pub fn fixed(
        location: Location,
        radius_m: f64,
        height_m: f64,
        rules: &AvoidanceRules,
    ) -> Result<Self, ObstacleError> {
        StaticObstacle::new(location, radius_m, height_m, rules.static_buffer_m).map(Self::Static)
    }

    /// Moving sphere using the configured moving buffer.
    pub fn moving(
        position: Location,
        radius_m: f64,
        rules: &AvoidanceRules,
    ) -> Result<Self, ObstacleError> {
        MovingObstacle::new(position, radius_m, rules.moving_buffer_m).map(Self::Moving)
    }

    /// Reference position (vertical center for cylinders, center for spheres).
    pub fn position(&self) -> Location {
        match self {
            Obstacle::Static(obstacle) => obstacle.location(),
            Obstacle::Moving(obstacle) => obstacle.position(),
        }
    }

    /// Physical horizontal extent at `alt`, no buffer.
    pub fn cross_sectional_radius(&self, alt: f64) -> f64 {
        match self {
            Obstacle::Static(obstacle) => obstacle.cross_sectional_radius(alt),
            Obstacle::Moving(obstacle) => obstacle.cross_sectional_radius(alt),
        }
    }

    /// Horizontal clearance demanded at `alt`. Zero when `alt` is clear of
    /// the obstacle and its buffer.
    pub fn avoid_radius(&self, alt: f64) -> f64 {
        match self {
            Obstacle::Static(obstacle) => obstacle.avoid_radius(alt),
            Obstacle::Moving(obstacle) => obstacle.avoid_radius(alt),
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, Obstacle::Moving(_))
    }

    /// Same obstacle with its safety buffer grown by `extra_m` (negative
    /// values are ignored).
    pub fn with_extra_buffer(&self, extra_m: f64) -> Self {
        let extra_m = extra_m.max(0.0);
        let mut grown = self.clone();
        match &mut grown {
            Obstacle::Static(obstacle) => obstacle.buffer_m += extra_m,
            Obstacle::Moving(obstacle) => obstacle.buffer_m += extra_m,
        }
        grown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tower() -> Obstacle {
        Obstacle::Static(
            StaticObstacle::new(Location::from_degrees(38.0, -76.0, 100.0), 20.0, 40.0, 15.0)
                .unwrap(),
        )
    }

    #[test]
    fn static_avoid_radius_scenario() {
        let obstacle = tower();
        assert!((obstacle.avoid_radius(100.0) - 35.0).abs() < 1e-9);
        let expected = 20.0 + (15.0f64.powi(2) - 10.0f64.powi(2)).sqrt();
        assert!((obstacle.avoid_radius(130.0) - expected).abs() < 1e-9);
        assert!((obstacle.avoid_radius(130.0) - 31.18).abs() < 0.01);
        assert_eq!(obstacle.avoid_radius(200.0), 0.0);
        assert!((obstacle.avoid_radius(70.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn static_cross_section_is_open_at_the_caps() {
        let obstacle = tower();
        assert_eq!(obstacle.cross_sectional_radius(100.0), 20.0);
        assert_eq!(obstacle.cross_sectional_radius(119.9), 20.0);
        assert_eq!(obstacle.cross_sectional_radius(120.0), 0.0);
        assert_eq!(obstacle.cross_sectional_radius(79.0), 0.0);
    }

    #[test]
    fn static_avoid_radius_is_continuous_and_non_increasing() {
        let obstacle = tower();
        let eps = 1e-7;
        // Top of the cylinder
        let at_top = obstacle.avoid_radius(120.0);
        assert!((obstacle.avoid_radius(120.0 + eps) - at_top).abs() < 1e-3);
        // Top of the buffer fillet blends down to the body radius, then drops
        // to zero once clear of the buffer band.
        let below_edge = obstacle.avoid_radius(135.0 - eps);
        assert!((below_edge - 20.0).abs() < 0.1);

        let mut previous = f64::INFINITY;
        let mut alt = 120.0;
        while alt < 134.99 {
            let radius = obstacle.avoid_radius(alt);
            assert!(radius <= previous + 1e-12, "radius grew at {alt}");
            previous = radius;
            alt += 0.25;
        }
    }

    #[test]
    fn avoid_radius_never_below_cross_section() {
        let obstacles = [
            tower(),
            Obstacle::Moving(
                MovingObstacle::new(Location::from_degrees(38.0, -76.0, 80.0), 10.0, 30.0).unwrap(),
            ),
        ];
        for obstacle in &obstacles {
            let mut alt = 0.0;
            while alt < 200.0 {
                assert!(obstacle.avoid_radius(alt) >= obstacle.cross_sectional_radius(alt));
                alt += 0.5;
            }
        }
    }

    #[test]
    fn moving_sphere_sections() {
        let obstacle = Obstacle::Moving(
            MovingObstacle::new(Location::from_degrees(38.0, -76.0, 80.0), 10.0, 30.0).unwrap(),
        );
        assert_eq!(obstacle.cross_sectional_radius(80.0), 10.0);
        assert!((obstacle.cross_sectional_radius(86.0) - 8.0).abs() < 1e-9);
        assert_eq!(obstacle.cross_sectional_radius(90.0), 0.0);
        assert_eq!(obstacle.avoid_radius(80.0), 40.0);
        assert!((obstacle.avoid_radius(104.0) - 32.0).abs() < 1e-9);
        assert_eq!(obstacle.avoid_radius(120.0), 0.0);
        assert!(obstacle.is_moving());
    }

    #[test]
    fn invalid_obstacles_are_rejected() {
        let loc = Location::from_degrees(38.0, -76.0, 50.0);
        assert_eq!(
            StaticObstacle::new(loc, 0.0, 10.0, 15.0),
            Err(ObstacleError::NonPositiveRadius(0.0))
        );
        assert_eq!(
            StaticObstacle::new(loc, 5.0, -1.0, 15.0),
            Err(ObstacleError::NegativeHeight(-1.0))
        );
        assert_eq!(
            MovingObstacle::new(loc, -3.0, 30.0),
            Err(ObstacleError::NonPositiveRadius(-3.0))
        );
        assert_eq!(
            MovingObstacle::new(loc, 3.0, -1.0),
            Err(ObstacleError::NegativeBuffer(-1.0))
        );
        assert_eq!(
            StaticObstacle::new(loc, f64::NAN, 10.0, 15.0),
            Err(ObstacleError::NonFinite("radius"))
        );
        // Zero height is a flat disc and is allowed.
        assert!(StaticObstacle::new(loc, 5.0, 0.0, 15.0).is_ok());
    }

    #[test]
    fn extra_buffer_widens_the_avoid_area_only() {
        let grown = tower().with_extra_buffer(5.0);
        assert_eq!(grown.avoid_radius(100.0), 40.0);
        assert_eq!(grown.cross_sectional_radius(100.0), 20.0);
        // Fillet now reaches 5 m higher.
        assert!(grown.avoid_radius(137.0) > 0.0);
        assert_eq!(tower().with_extra_buffer(-3.0), tower());
    }

    #[test]
    fn constructors_take_buffers_from_rules() {
        let rules = AvoidanceRules::default();
        let loc = Location::from_degrees(38.0, -76.0, 50.0);
        let fixed = Obstacle::fixed(loc, 10.0, 20.0, &rules).unwrap();
        assert_eq!(fixed.avoid_radius(50.0), 10.0 + rules.static_buffer_m);
        let moving = Obstacle::moving(loc, 10.0, &rules).unwrap();
        assert_eq!(moving.avoid_radius(50.0), 10.0 + rules.moving_buffer_m);
    }
}
