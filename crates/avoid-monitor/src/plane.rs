//! Boundary to the autopilot link.

use avoid_core::models::{Command, PlaneState};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("autopilot link disconnected")]
    Disconnected,
    #[error("no telemetry received yet")]
    NoTelemetry,
    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Telemetry source and command sink for one aircraft.
///
/// Calls are made from the monitor task and must not block for long; an
/// implementation backed by a slow transport should cache the latest state.
pub trait Plane: Send + Sync {
    fn state(&self) -> Result<PlaneState, LinkError>;

    fn send_command(&self, command: &Command) -> Result<(), LinkError>;
}
