//! Lateral dodge waypoints around blocking obstacles.

use crate::intersect::{check_segment, is_in_avoid_radius};
use crate::models::{DodgeSide, Location, Offset};
use crate::obstacle::Obstacle;
use crate::overlap::overlap_cluster;
use crate::spatial::GeoFrame;
use serde::{Deserialize, Serialize};

/// Waypoint that takes the aircraft abeam of a blocking obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DodgePlan {
    pub waypoint: Location,
    pub side: DodgeSide,
    /// Index of the blocking obstacle the plan was built for
    pub obstacle_index: usize,
    /// Obstacles cleared together with it because their areas merge
    pub cluster: Vec<usize>,
    /// Cross-track offset of the waypoint, right of track positive
    pub lateral_offset_m: f64,
}

/// Plan a dodge around `obstacles[blocking_index]` on the way from `plane`
/// to `target`.
///
/// The waypoint sits abeam the obstacle, `margin_m` beyond the outermost
/// avoid radius of its overlap cluster, on whichever side needs the smaller
/// deviation. If that spot is inside some other obstacle's avoid radius the
/// opposite side is used when it is free. Returns `None` when the obstacle
/// does not exist or has no avoid area at the altitude the track passes it.
pub fn plan_dodge(
    frame: &GeoFrame,
    plane: &Location,
    target: &Location,
    obstacles: &[Obstacle],
    blocking_index: usize,
    margin_m: f64,
) -> Option<DodgePlan> {
    let blocking = obstacles.get(blocking_index)?;
    let pass_alt = check_segment(frame, blocking, plane, target)
        .geometry()
        .map_or(plane.alt, |geometry| geometry.pass_alt_m);

    let cluster = overlap_cluster(frame, obstacles, blocking_index, pass_alt);
    if cluster.is_empty() {
        return None;
    }

    let bearing = frame.bearing(plane, target);
    let (mut left_x, mut right_x) = (f64::INFINITY, f64::NEG_INFINITY);
    for &idx in &cluster {
        let obstacle = &obstacles[idx];
        let offset = frame.distance(plane, &obstacle.position(), bearing);
        let radius = obstacle.avoid_radius(pass_alt);
        left_x = left_x.min(offset.x - radius);
        right_x = right_x.max(offset.x + radius);
    }
    let left = (DodgeSide::Left, left_x - margin_m);
    let right = (DodgeSide::Right, right_x + margin_m);

    let along_track = frame.distance(plane, &blocking.position(), bearing).y.max(0.0);
    let place = |lateral: f64| {
        let offset = Offset::new(lateral, along_track, pass_alt - plane.alt).rotated(-bearing);
        frame.location_at(plane, &offset)
    };
    let is_free = |loc: &Location| {
        !obstacles
            .iter()
            .any(|obstacle| is_in_avoid_radius(frame, obstacle, loc))
    };

    let (preferred, fallback) = if left.1.abs() < right.1.abs() {
        (left, right)
    } else {
        (right, left)
    };

    let mut chosen = preferred;
    let mut waypoint = place(preferred.1);
    if !is_free(&waypoint) {
        let other = place(fallback.1);
        if is_free(&other) {
            chosen = fallback;
            waypoint = other;
        }
    }

    Some(DodgePlan {
        waypoint,
        side: chosen.0,
        obstacle_index: blocking_index,
        cluster,
        lateral_offset_m: chosen.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::StaticObstacle;

    fn origin() -> Location {
        Location::from_degrees(38.1446, -76.4280, 100.0)
    }

    fn at(x: f64, y: f64) -> Location {
        GeoFrame::WGS84.location_at(&origin(), &Offset::new(x, y, 0.0))
    }

    /// Avoid radius 35 m at the aircraft's altitude.
    fn tower(x: f64, y: f64) -> Obstacle {
        Obstacle::Static(StaticObstacle::new(at(x, y), 20.0, 40.0, 15.0).unwrap())
    }

    #[test]
    fn dodges_to_the_clear_side_and_clears_the_obstacle() {
        let frame = GeoFrame::WGS84;
        let obstacles = vec![tower(10.0, 500.0)];
        let plan = plan_dodge(&frame, &origin(), &at(0.0, 2000.0), &obstacles, 0, 10.0).unwrap();

        assert_eq!(plan.side, DodgeSide::Left);
        assert!((plan.lateral_offset_m + 35.0).abs() < 1e-6);
        assert_eq!(plan.cluster, vec![0]);

        let clearance = frame.horizontal_distance(&obstacles[0].position(), &plan.waypoint);
        assert!((clearance - 45.0).abs() < 1e-3);
        assert!((plan.waypoint.alt - 100.0).abs() < 1e-9);
        assert!(!is_in_avoid_radius(&frame, &obstacles[0], &plan.waypoint));
    }

    #[test]
    fn right_of_an_eastbound_track_is_south() {
        let frame = GeoFrame::WGS84;
        let obstacles = vec![tower(500.0, 10.0)];
        let plan = plan_dodge(&frame, &origin(), &at(2000.0, 0.0), &obstacles, 0, 10.0).unwrap();

        assert_eq!(plan.side, DodgeSide::Right);
        let offset = frame.distance(&origin(), &plan.waypoint, 0.0);
        assert!((offset.x - 500.0).abs() < 1e-3);
        assert!((offset.y + 35.0).abs() < 1e-3);
    }

    #[test]
    fn merged_obstacles_are_cleared_together() {
        let frame = GeoFrame::WGS84;
        // Dodging the first tower alone to the left would land inside the second.
        let obstacles = vec![tower(10.0, 500.0), tower(-30.0, 510.0)];
        let plan = plan_dodge(&frame, &origin(), &at(0.0, 2000.0), &obstacles, 0, 10.0).unwrap();

        let mut cluster = plan.cluster.clone();
        cluster.sort_unstable();
        assert_eq!(cluster, vec![0, 1]);
        assert_eq!(plan.side, DodgeSide::Right);
        assert!((plan.lateral_offset_m - 55.0).abs() < 1e-6);
        for obstacle in &obstacles {
            assert!(!is_in_avoid_radius(&frame, obstacle, &plan.waypoint));
        }
    }

    #[test]
    fn falls_back_when_the_clear_side_is_occupied() {
        let frame = GeoFrame::WGS84;
        // Second tower does not merge with the first but covers the left spot.
        let obstacles = vec![tower(5.0, 500.0), tower(-70.0, 500.0)];
        let plan = plan_dodge(&frame, &origin(), &at(0.0, 2000.0), &obstacles, 0, 10.0).unwrap();

        assert_eq!(plan.cluster, vec![0]);
        assert_eq!(plan.side, DodgeSide::Right);
        assert!((plan.lateral_offset_m - 50.0).abs() < 1e-6);
    }

    #[test]
    fn nothing_to_plan_without_an_avoid_area() {
        let frame = GeoFrame::WGS84;
        let high = Obstacle::Static(
            StaticObstacle::new(at(0.0, 500.0).with_alt(400.0), 20.0, 40.0, 15.0).unwrap(),
        );
        let target = at(0.0, 2000.0);
        assert!(plan_dodge(&frame, &origin(), &target, &[high], 0, 10.0).is_none());
        assert!(plan_dodge(&frame, &origin(), &target, &[], 0, 10.0).is_none());
    }
}
