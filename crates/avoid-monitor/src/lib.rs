//! Background avoidance monitor for a single aircraft.

pub mod config;
pub mod decision;
pub mod monitor;
pub mod plane;
pub mod registry;

pub use config::MonitorConfig;
pub use decision::{evaluate, ActiveDodge, Decision};
pub use monitor::{AvoidanceMonitor, MonitorState};
pub use plane::{LinkError, Plane};
pub use registry::{KnownObstacle, MovingFeed, ObstacleRegistry, ObstacleSample, RegistryError};
