pub mod dodge;
pub mod intersect;
pub mod models;
pub mod obstacle;
pub mod overlap;
pub mod rules;
pub mod spatial;
pub mod turn;

pub use dodge::{plan_dodge, DodgePlan};
pub use intersect::{
    check_segment, is_approaching, is_in_avoid_radius, is_loc_inside, is_segment_blocked,
    SegmentCheck, SegmentGeometry,
};
pub use models::{AvoidanceCommand, Command, DodgeSide, Location, Offset, PlaneState};
pub use obstacle::{MovingObstacle, Obstacle, ObstacleError, StaticObstacle};
pub use overlap::{does_overlap, overlap_cluster};
pub use rules::AvoidanceRules;
pub use spatial::{normalize_angle, wrap_angle, GeoFrame};
pub use turn::{
    blocking_obstacles, can_travel, turn_to, Blockage, TurnBranch, TurnPerformance, TurnSolution,
};
