//! Per-tick avoidance decision.
//!
//! Pure function of the plane snapshot, the obstacle snapshot and the dodge
//! in progress, so the monitor loop only has to carry state between ticks.

use avoid_core::dodge::{plan_dodge, DodgePlan};
use avoid_core::intersect::{is_approaching, is_in_avoid_radius, SegmentCheck};
use avoid_core::models::{AvoidanceCommand, DodgeSide, Location, PlaneState};
use avoid_core::obstacle::Obstacle;
use avoid_core::rules::AvoidanceRules;
use avoid_core::spatial::GeoFrame;
use avoid_core::turn::{blocking_obstacles, can_travel};
use serde::Serialize;

use crate::registry::KnownObstacle;

/// Dodge the autopilot is currently flying.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveDodge {
    /// Waypoint the plane was heading for when the dodge was inserted
    pub original_target: Location,
    pub obstacle_id: String,
    pub waypoint: Location,
    pub side: DodgeSide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing to do this tick
    Hold,
    Dodge(ActiveDodge),
    Resume { waypoint: Location },
}

impl Decision {
    pub fn command(&self) -> Option<AvoidanceCommand> {
        match self {
            Decision::Hold => None,
            Decision::Dodge(dodge) => Some(AvoidanceCommand::InsertDodge {
                waypoint: dodge.waypoint,
                obstacle_id: dodge.obstacle_id.clone(),
                side: dodge.side,
            }),
            Decision::Resume { waypoint } => Some(AvoidanceCommand::ResumeRoute {
                waypoint: *waypoint,
            }),
        }
    }
}

/// A replacement dodge closer than this to the one being flown is not sent.
const REPLAN_DISTANCE_M: f64 = 5.0;

/// Decide what the plane should do next.
///
/// 1. While a dodge is active, resume the original route once it can be
///    flown clear of every obstacle with `resume_margin_m` to spare.
/// 2. Inside an avoid radius and still closing on that obstacle: dodge it.
/// 3. Otherwise dodge the nearest obstacle blocking the leg to the next
///    waypoint. Obstacles the plane is already leaving are not dodged.
///
/// Steps 2 and 3 run whether or not a dodge is active, so an obstacle that
/// appears on the dodge leg, or on the route once the dodge waypoint is
/// reached, replaces the active dodge. The original target is kept so the
/// eventual resume returns to the route.
pub fn evaluate(
    plane: &PlaneState,
    obstacles: &[KnownObstacle],
    active: Option<&ActiveDodge>,
    rules: &AvoidanceRules,
) -> Decision {
    let frame = &rules.frame;
    let shapes: Vec<Obstacle> = obstacles.iter().map(|known| known.obstacle.clone()).collect();

    if let Some(dodge) = active {
        let grown: Vec<Obstacle> = shapes
            .iter()
            .map(|shape| shape.with_extra_buffer(rules.resume_margin_m))
            .collect();
        if can_travel(frame, &rules.performance, plane, &dodge.original_target, &grown) {
            return Decision::Resume {
                waypoint: dodge.original_target,
            };
        }
    }

    let target = plane.next_waypoint;
    let original_target = active.map_or(target, |dodge| dodge.original_target);
    let plan = |idx: usize| {
        plan_dodge(frame, &plane.location, &target, &shapes, idx, rules.dodge_margin_m)
    };

    let escape = shapes.iter().enumerate().find_map(|(idx, obstacle)| {
        if is_in_avoid_radius(frame, obstacle, &plane.location)
            && is_approaching(frame, obstacle, plane)
        {
            tracing::debug!("Inside avoid radius of {} and closing", obstacles[idx].id);
            plan(idx)
        } else {
            None
        }
    });

    let dodge = escape.or_else(|| {
        blocking_obstacles(frame, &rules.performance, plane, &target, &shapes)
            .into_iter()
            .filter(|blockage| matches!(blockage.check, SegmentCheck::Blocked(_)))
            .find_map(|blockage| {
                let planned = plan(blockage.index);
                if planned.is_none() {
                    tracing::debug!(
                        "No dodge available around {} at {:.0} m",
                        obstacles[blockage.index].id,
                        blockage.distance_m
                    );
                }
                planned
            })
    });

    let Some(dodge) = dodge else {
        return Decision::Hold;
    };
    if let Some(current) = active {
        if is_flying(frame, plane, current)
            && frame.horizontal_distance(&dodge.waypoint, &current.waypoint) < REPLAN_DISTANCE_M
        {
            return Decision::Hold;
        }
    }
    start_dodge(dodge, obstacles, original_target)
}

/// The autopilot is still heading for the active dodge waypoint.
fn is_flying(frame: &GeoFrame, plane: &PlaneState, dodge: &ActiveDodge) -> bool {
    frame.horizontal_distance(&plane.next_waypoint, &dodge.waypoint) < REPLAN_DISTANCE_M
}

fn start_dodge(plan: DodgePlan, obstacles: &[KnownObstacle], original_target: Location) -> Decision {
    Decision::Dodge(ActiveDodge {
        original_target,
        obstacle_id: obstacles[plan.obstacle_index].id.clone(),
        waypoint: plan.waypoint,
        side: plan.side,
    })
}
