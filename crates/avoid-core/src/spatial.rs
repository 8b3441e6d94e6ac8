//! Spatial math under the flat-earth (local tangent-plane) approximation.
//!
//! Valid for offsets that are small compared to the earth radius, a few
//! kilometers at most. No curvature correction is applied beyond the local
//! linearization.

use crate::models::{Location, Offset};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// WGS84 equatorial radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// WGS84 first eccentricity.
pub const EARTH_ECCENTRICITY: f64 = 0.081_819_190_8;

/// Reference ellipsoid used for all distance/bearing conversions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFrame {
    pub equatorial_radius_m: f64,
    pub eccentricity: f64,
}

impl Default for GeoFrame {
    fn default() -> Self {
        Self::WGS84
    }
}

impl GeoFrame {
    pub const WGS84: GeoFrame = GeoFrame {
        equatorial_radius_m: EARTH_RADIUS_M,
        eccentricity: EARTH_ECCENTRICITY,
    };

    /// Meridional radius of curvature and radius of curvature in the prime
    /// vertical at `lat`.
    ///
    /// # Arguments
    /// * `lat` - Latitude in radians
    ///
    /// # Returns
    /// `(r_meridional, r_normal)` in meters
    pub fn earth_radii(&self, lat: f64) -> (f64, f64) {
        let e2 = self.eccentricity * self.eccentricity;
        let denom = 1.0 - e2 * lat.sin().powi(2);
        let r_meridional = self.equatorial_radius_m * (1.0 - e2) / denom.powf(1.5);
        let r_normal = self.equatorial_radius_m / denom.sqrt();
        (r_meridional, r_normal)
    }

    /// Vector from `from` to `to` in east/north/up meters, rotated by
    /// `rotation` radians.
    ///
    /// Passing a bearing as `rotation` expresses the result in the track frame
    /// of that bearing: `y` along track, `x` cross-track (right positive).
    pub fn distance(&self, from: &Location, to: &Location, rotation: f64) -> Offset {
        let (r_meridional, r_normal) = self.earth_radii(from.lat);
        let offset = Offset {
            x: r_normal * from.lat.cos() * (to.lon - from.lon),
            y: r_meridional * (to.lat - from.lat),
            z: to.alt - from.alt,
        };
        if rotation == 0.0 {
            offset
        } else {
            offset.rotated(rotation)
        }
    }

    /// Location reached by applying an east/north/up `offset` to `reference`.
    /// Inverse of [`GeoFrame::distance`] with zero rotation.
    pub fn location_at(&self, reference: &Location, offset: &Offset) -> Location {
        let (r_meridional, r_normal) = self.earth_radii(reference.lat);
        Location {
            lat: reference.lat + offset.y / r_meridional,
            lon: reference.lon + offset.x / (r_normal * reference.lat.cos()),
            alt: reference.alt + offset.z,
        }
    }

    /// Bearing from `from` to `to` in radians.
    /// Returns bearing in [0, 2π), 0 = north, π/2 = east.
    pub fn bearing(&self, from: &Location, to: &Location) -> f64 {
        let offset = self.distance(from, to, 0.0);
        normalize_angle(offset.x.atan2(offset.y))
    }

    /// Horizontal distance in meters between two locations.
    pub fn horizontal_distance(&self, from: &Location, to: &Location) -> f64 {
        self.distance(from, to, 0.0).magnitude_xy()
    }
}

/// Normalize an angle into [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = normalize_angle(angle);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}
