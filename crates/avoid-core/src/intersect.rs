//! Segment and point tests against obstacle clearance volumes.

use crate::models::{Location, PlaneState};
use crate::obstacle::Obstacle;
use crate::spatial::{wrap_angle, GeoFrame};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Track-frame geometry of an obstacle relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentGeometry {
    /// Distance of the obstacle along the track from the segment start
    pub along_track_m: f64,
    /// Signed cross-track distance of the obstacle, right of track positive
    pub cross_track_m: f64,
    /// Horizontal length of the segment
    pub track_length_m: f64,
    /// Altitude of the segment where it passes the obstacle
    pub pass_alt_m: f64,
    /// Obstacle avoid radius at `pass_alt_m`
    pub avoid_radius_m: f64,
}

/// Result of testing one segment against one obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SegmentCheck {
    /// The segment passes clear of the avoid radius
    Clear,
    /// The obstacle lies behind the segment start
    Behind,
    /// The segment starts inside the avoid radius; not evaluated further
    StartsInside(SegmentGeometry),
    /// The segment passes inside the avoid radius
    Blocked(SegmentGeometry),
}

impl SegmentCheck {
    pub fn geometry(&self) -> Option<&SegmentGeometry> {
        match self {
            SegmentCheck::StartsInside(geometry) | SegmentCheck::Blocked(geometry) => {
                Some(geometry)
            }
            SegmentCheck::Clear | SegmentCheck::Behind => None,
        }
    }

    /// Whether the caller has to route around this obstacle.
    pub fn needs_avoidance(&self) -> bool {
        matches!(self, SegmentCheck::StartsInside(_) | SegmentCheck::Blocked(_))
    }
}

/// `loc` is physically inside the obstacle.
pub fn is_loc_inside(frame: &GeoFrame, obstacle: &Obstacle, loc: &Location) -> bool {
    let radius = obstacle.cross_sectional_radius(loc.alt);
    radius > frame.horizontal_distance(&obstacle.position(), loc)
}

/// `loc` is within the obstacle's avoid radius at its own altitude.
pub fn is_in_avoid_radius(frame: &GeoFrame, obstacle: &Obstacle, loc: &Location) -> bool {
    let radius = obstacle.avoid_radius(loc.alt);
    radius > frame.horizontal_distance(&obstacle.position(), loc)
}

/// Test the straight segment `from` → `to`, altitude interpolated linearly
/// along track, against the obstacle's avoid radius.
///
/// A single radius is evaluated at the altitude the segment has where it is
/// abeam the obstacle. This is a fair approximation when the climb or descent
/// across the obstacle's footprint is small compared to its buffer band.
pub fn check_segment(
    frame: &GeoFrame,
    obstacle: &Obstacle,
    from: &Location,
    to: &Location,
) -> SegmentCheck {
    let bearing = frame.bearing(from, to);
    let track = frame.distance(from, to, bearing);
    let obs = frame.distance(from, &obstacle.position(), bearing);

    let pass_alt_m = if track.y.abs() > f64::EPSILON {
        from.alt + obs.y / track.y * (to.alt - from.alt)
    } else {
        to.alt
    };
    let avoid_radius_m = obstacle.avoid_radius(pass_alt_m);
    let geometry = SegmentGeometry {
        along_track_m: obs.y,
        cross_track_m: obs.x,
        track_length_m: track.y,
        pass_alt_m,
        avoid_radius_m,
    };

    if is_in_avoid_radius(frame, obstacle, from) {
        return SegmentCheck::StartsInside(geometry);
    }

    if avoid_radius_m <= 0.0 {
        return SegmentCheck::Clear;
    }

    if obs.y < 0.0 {
        return SegmentCheck::Behind;
    }

    let blocked = if obs.y > track.y {
        // Beyond the destination: only the end of the segment can intrude.
        is_in_avoid_radius(frame, obstacle, to)
    } else {
        obs.x.abs() < avoid_radius_m
    };

    if blocked {
        SegmentCheck::Blocked(geometry)
    } else {
        SegmentCheck::Clear
    }
}

/// Whether the segment `from` → `to` passes inside the obstacle's avoid
/// radius. `from` must not already be inside it; see [`check_segment`].
pub fn is_segment_blocked(
    frame: &GeoFrame,
    obstacle: &Obstacle,
    from: &Location,
    to: &Location,
) -> bool {
    matches!(
        check_segment(frame, obstacle, from, to),
        SegmentCheck::Blocked(_)
    )
}

/// Whether the plane is flying towards the obstacle, i.e. the obstacle is
/// within 90 degrees either side of the nose. A plane already inside the
/// obstacle is not approaching it.
pub fn is_approaching(frame: &GeoFrame, obstacle: &Obstacle, plane: &PlaneState) -> bool {
    if is_loc_inside(frame, obstacle, &plane.location) {
        return false;
    }
    let bearing = frame.bearing(&plane.location, &obstacle.position());
    wrap_angle(plane.heading - bearing).abs() < FRAC_PI_2
}
