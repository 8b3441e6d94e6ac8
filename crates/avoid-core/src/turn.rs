//! Minimum-radius banked turns onto a straight leg towards a target.
//!
//! The aircraft is modeled as flying a constant-radius arc at the configured
//! bank angle until its nose points at the target, then a straight leg. All
//! solving happens in the heading frame: `i` lateral (right positive), `j`
//! forward, origin at the aircraft.

use crate::intersect::{check_segment, SegmentCheck};
use crate::models::{Location, Offset, PlaneState};
use crate::obstacle::Obstacle;
use crate::spatial::{normalize_angle, GeoFrame};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Default bank angle for avoidance turns, 30 degrees.
pub const BANKING_ANGLE_RAD: f64 = 0.523_598_775_6;
/// Standard gravity in m/s².
pub const ACCEL_GRAV: f64 = 9.806_65;

/// Lateral offset below which a target counts as dead ahead or dead astern,
/// relative to the turning radius.
const IN_LINE_TOLERANCE: f64 = 1e-6;
/// Turning radius below which the aircraft is treated as able to pivot.
const MIN_TURN_RADIUS_M: f64 = 1e-9;
/// Turn angles this close to a full circle are rounding noise around zero.
const FULL_CIRCLE_TOLERANCE: f64 = 1e-9;

/// Banked-turn performance of the airframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnPerformance {
    /// Bank angle in radians, within (0, π/2)
    pub banking_angle_rad: f64,
    /// Gravitational acceleration in m/s²
    pub accel_grav: f64,
}

impl Default for TurnPerformance {
    fn default() -> Self {
        Self {
            banking_angle_rad: BANKING_ANGLE_RAD,
            accel_grav: ACCEL_GRAV,
        }
    }
}

impl TurnPerformance {
    /// Radius in meters of a level turn at `airspeed` m/s.
    pub fn turning_radius(&self, airspeed: f64) -> f64 {
        airspeed * airspeed / (self.accel_grav * self.banking_angle_rad.tan())
    }
}

/// Which closed-form case produced a [`TurnSolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnBranch {
    /// Target on the nose, no turn before the straight leg
    StraightAhead,
    /// Target dead astern, half-circle reversal then straight leg
    Reversal,
    /// Zero turning radius, the aircraft turns in place
    Pivot,
    /// General case, arc to the tangent point then straight leg
    Tangent,
}

/// Arc-then-straight path from the aircraft to a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnSolution {
    /// Heading change flown on the arc, in [0, 2π)
    pub turn_angle: f64,
    /// Signed turning radius, negative for a left turn
    pub radius_m: f64,
    pub branch: TurnBranch,
    /// Aircraft to turn exit, east/north/up
    pub exit: Offset,
    /// Turn exit to target, east/north/up
    pub straight_leg: Offset,
    pub arc_length_m: f64,
}

/// Solve the minimum-radius turn from `plane_loc` flying `heading` at
/// `airspeed` onto a straight leg through `target`.
///
/// The climb or descent to the target is shared between arc and straight leg
/// in proportion to their lengths. Never fails on finite input: the in-line
/// and zero-radius configurations have their own branches.
pub fn turn_to(
    frame: &GeoFrame,
    performance: &TurnPerformance,
    plane_loc: &Location,
    target: &Location,
    heading: f64,
    airspeed: f64,
) -> TurnSolution {
    let rel = frame.distance(plane_loc, target, heading);
    let (i, j) = (rel.x, rel.y);
    let r_abs = performance.turning_radius(airspeed).abs();

    if !(r_abs > MIN_TURN_RADIUS_M) {
        let turn_angle = if i == 0.0 && j == 0.0 {
            0.0
        } else {
            normalize_angle(i.atan2(j))
        };
        return finish(TurnBranch::Pivot, turn_angle, 0.0, (0.0, 0.0), rel, heading);
    }

    // Turn towards the side the target is on.
    let mut radius = if i < 0.0 { -r_abs } else { r_abs };

    if i.abs() <= IN_LINE_TOLERANCE * r_abs {
        return if j >= 0.0 {
            finish(TurnBranch::StraightAhead, 0.0, radius, (0.0, 0.0), rel, heading)
        } else {
            finish(TurnBranch::Reversal, PI, radius, (2.0 * radius, 0.0), rel, heading)
        };
    }

    // A target inside the turn circle cannot be reached on that side without
    // widening first; the opposite circle always contains it on its outside.
    if (i - radius).powi(2) + j * j < radius * radius {
        radius = -radius;
    }

    let (a, b) = tangent_point(radius, i, j);
    let mut turn_angle = normalize_angle(b.atan2(radius.signum() * (radius - a)));
    if turn_angle > TAU - FULL_CIRCLE_TOLERANCE {
        turn_angle = 0.0;
    }

    finish(TurnBranch::Tangent, turn_angle, radius, (a, b), rel, heading)
}

/// Point on the circle centered at `(radius, 0)` where a tangent line passes
/// through `(i, j)` in the direction of travel around the circle.
fn tangent_point(radius: f64, i: f64, j: f64) -> (f64, f64) {
    let r_abs = radius.abs();
    let dx = i - radius;
    let dy = j;
    let d = dx.hypot(dy);

    let alpha = dy.atan2(dx);
    let beta = (r_abs / d).min(1.0).acos();

    // Clockwise for right turns, counter-clockwise for left turns.
    let along = |theta: f64| -> (f64, f64, f64) {
        let a = radius + r_abs * theta.cos();
        let b = r_abs * theta.sin();
        let (vx, vy) = (radius.signum() * theta.sin(), -radius.signum() * theta.cos());
        let towards_target = (i - a) * vx + (j - b) * vy;
        (a, b, towards_target)
    };

    let (a1, b1, dot1) = along(alpha + beta);
    let (a2, b2, dot2) = along(alpha - beta);
    if dot1 >= dot2 {
        (a1, b1)
    } else {
        (a2, b2)
    }
}

fn finish(
    branch: TurnBranch,
    turn_angle: f64,
    radius: f64,
    (a, b): (f64, f64),
    rel: Offset,
    heading: f64,
) -> TurnSolution {
    let arc_length_m = radius.abs() * turn_angle;
    let straight_m = (rel.x - a).hypot(rel.y - b);
    let total = arc_length_m + straight_m;
    let exit_z = if total > 0.0 {
        rel.z * arc_length_m / total
    } else {
        0.0
    };

    TurnSolution {
        turn_angle,
        radius_m: radius,
        branch,
        exit: Offset::new(a, b, exit_z).rotated(-heading),
        straight_leg: Offset::new(rel.x - a, rel.y - b, rel.z - exit_z).rotated(-heading),
        arc_length_m,
    }
}

/// Obstacle that blocks the straight leg of a turn solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blockage {
    /// Index into the obstacle slice that was tested
    pub index: usize,
    pub check: SegmentCheck,
    /// Horizontal distance from the aircraft to the obstacle
    pub distance_m: f64,
}

/// Obstacles blocking the straight leg from the turn exit to `target`,
/// nearest to the aircraft first.
pub fn blocking_obstacles(
    frame: &GeoFrame,
    performance: &TurnPerformance,
    plane: &PlaneState,
    target: &Location,
    obstacles: &[Obstacle],
) -> Vec<Blockage> {
    let solution = turn_to(
        frame,
        performance,
        &plane.location,
        target,
        plane.heading,
        plane.airspeed,
    );
    let exit = frame.location_at(&plane.location, &solution.exit);

    let mut blocking: Vec<Blockage> = obstacles
        .iter()
        .enumerate()
        .filter_map(|(index, obstacle)| {
            let check = check_segment(frame, obstacle, &exit, target);
            check.needs_avoidance().then(|| Blockage {
                index,
                check,
                distance_m: frame.horizontal_distance(&plane.location, &obstacle.position()),
            })
        })
        .collect();

    blocking.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    blocking
}

/// Whether the aircraft can turn onto and fly the straight leg to `target`
/// without entering any obstacle's avoid radius.
pub fn can_travel(
    frame: &GeoFrame,
    performance: &TurnPerformance,
    plane: &PlaneState,
    target: &Location,
    obstacles: &[Obstacle],
) -> bool {
    blocking_obstacles(frame, performance, plane, target, obstacles).is_empty()
}
