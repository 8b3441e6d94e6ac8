//! Avoidance monitor loop.
//!
//! Waits for takeoff, then evaluates the plane against every known obstacle
//! on a fixed cadence and sends dodge/resume commands until closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use avoid_core::models::{Command, PlaneState};

use crate::config::MonitorConfig;
use crate::decision::{self, ActiveDodge, Decision};
use crate::plane::Plane;
use crate::registry::ObstacleRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Waiting for takeoff
    Inactive,
    Armed,
    /// Armed but not evaluating
    Suspended,
    Closed,
}

struct Shared {
    armed: AtomicBool,
    enabled: AtomicBool,
    closed: AtomicBool,
    close_tx: watch::Sender<bool>,
}

/// Handle to a running monitor task.
pub struct AvoidanceMonitor {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AvoidanceMonitor {
    /// Start the monitor loop on the current tokio runtime.
    pub fn spawn(
        plane: Arc<dyn Plane>,
        registry: Arc<ObstacleRegistry>,
        config: MonitorConfig,
    ) -> Self {
        let (close_tx, close_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            armed: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            close_tx,
        });

        let task = tokio::spawn(run_monitor_loop(
            plane,
            registry,
            config,
            shared.clone(),
            close_rx,
        ));

        Self {
            shared,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.shared.closed.load(Ordering::SeqCst) {
            MonitorState::Closed
        } else if !self.shared.armed.load(Ordering::SeqCst) {
            MonitorState::Inactive
        } else if self.shared.enabled.load(Ordering::SeqCst) {
            MonitorState::Armed
        } else {
            MonitorState::Suspended
        }
    }

    /// Resume evaluation after [`stop_monitoring`](Self::stop_monitoring).
    pub fn start_monitoring(&self) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        if !self.shared.enabled.swap(true, Ordering::SeqCst) {
            tracing::info!("Avoidance monitoring resumed");
        }
    }

    /// Suspend evaluation. Before takeoff this makes the monitor arm straight
    /// into the suspended state.
    pub fn stop_monitoring(&self) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.shared.enabled.swap(false, Ordering::SeqCst) {
            tracing::info!("Avoidance monitoring suspended");
        }
    }

    /// Stop the monitor for good. The loop wakes immediately and never
    /// evaluates or sends anything afterwards.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.close_tx.send_replace(true);
        tracing::info!("Avoidance monitor closing");
    }

    /// Wait for the loop task to finish. Only the first caller waits.
    pub async fn join(&self) {
        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Avoidance monitor task failed: {}", e);
            }
        }
    }
}

impl Drop for AvoidanceMonitor {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_monitor_loop(
    plane: Arc<dyn Plane>,
    registry: Arc<ObstacleRegistry>,
    config: MonitorConfig,
    shared: Arc<Shared>,
    mut close_rx: watch::Receiver<bool>,
) {
    if !wait_for_takeoff(plane.as_ref(), &config, &shared, &mut close_rx).await {
        tracing::info!("Avoidance monitor closed before takeoff");
        return;
    }
    shared.armed.store(true, Ordering::SeqCst);
    tracing::info!(
        "Takeoff confirmed, avoidance monitor armed ({} obstacles known)",
        registry.len()
    );

    let mut ticker = interval(config.armed_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_state: Option<PlaneState> = None;
    let mut active: Option<ActiveDodge> = None;

    loop {
        tokio::select! {
            _ = close_rx.changed() => {
                break;
            }
            _ = ticker.tick() => {
                if shared.closed.load(Ordering::SeqCst) {
                    break;
                }
                if !shared.enabled.load(Ordering::SeqCst) {
                    continue;
                }

                match plane.state() {
                    Ok(state) => last_state = Some(state),
                    Err(e) => tracing::warn!("Telemetry unavailable, using last known state: {}", e),
                }
                let Some(state) = last_state.as_ref() else {
                    continue;
                };

                let obstacles = registry.snapshot();
                let decision = decision::evaluate(state, &obstacles, active.as_ref(), &config.rules);
                let Some(command) = decision.command() else {
                    continue;
                };

                if shared.closed.load(Ordering::SeqCst) {
                    break;
                }
                let command = Command::new(command);
                if let Err(e) = plane.send_command(&command) {
                    tracing::warn!("Failed to send {:?}, retrying next tick: {}", command.command, e);
                    continue;
                }

                match decision {
                    Decision::Dodge(dodge) => {
                        tracing::info!(
                            "Dodging obstacle {} to the {:?} (command {})",
                            dodge.obstacle_id,
                            dodge.side,
                            command.command_id
                        );
                        active = Some(dodge);
                    }
                    Decision::Resume { .. } => {
                        tracing::info!("Route clear, resuming (command {})", command.command_id);
                        active = None;
                    }
                    Decision::Hold => {}
                }
            }
        }
    }

    tracing::info!("Avoidance monitor stopped");
}

/// Poll until the plane has been above the takeoff altitude for enough
/// consecutive samples. Returns false if closed first.
async fn wait_for_takeoff(
    plane: &dyn Plane,
    config: &MonitorConfig,
    shared: &Shared,
    close_rx: &mut watch::Receiver<bool>,
) -> bool {
    let mut ticker = interval(config.arming_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive = 0u32;

    loop {
        tokio::select! {
            _ = close_rx.changed() => {
                return false;
            }
            _ = ticker.tick() => {
                if shared.closed.load(Ordering::SeqCst) {
                    return false;
                }
                match plane.state() {
                    Ok(state) => {
                        let height = state.location.alt - state.home_location.alt;
                        if height > config.takeoff_altitude_m {
                            consecutive += 1;
                            tracing::debug!("Above takeoff altitude ({:.1} m), sample {}", height, consecutive);
                        } else {
                            consecutive = 0;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Telemetry unavailable while waiting for takeoff: {}", e);
                        consecutive = 0;
                    }
                }
                if consecutive >= config.takeoff_debounce_samples {
                    return true;
                }
            }
        }
    }
}
