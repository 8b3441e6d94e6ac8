//! Monitor lifecycle tests on a paused clock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use avoid_core::models::{AvoidanceCommand, Command, DodgeSide, Location, Offset, PlaneState};
use avoid_core::spatial::GeoFrame;
use avoid_monitor::{AvoidanceMonitor, LinkError, MonitorConfig, MonitorState, ObstacleRegistry, Plane};

fn home() -> Location {
    Location::from_degrees(38.1446, -76.4280, 0.0)
}

fn at(x: f64, y: f64, alt: f64) -> Location {
    GeoFrame::WGS84.location_at(&home(), &Offset::new(x, y, alt))
}

/// Autopilot stand-in that records commands and follows waypoint changes.
struct MockPlane {
    state: Mutex<PlaneState>,
    sent: Mutex<Vec<Command>>,
    send_attempts: AtomicUsize,
    telemetry_down: AtomicBool,
    reject_commands: AtomicBool,
}

impl MockPlane {
    fn new(alt: f64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PlaneState {
                location: at(0.0, 0.0, alt),
                heading: 0.0,
                airspeed: 20.0,
                pitch: 0.0,
                roll: 0.0,
                next_waypoint: at(0.0, 2000.0, alt),
                home_location: home(),
            }),
            sent: Mutex::new(Vec::new()),
            send_attempts: AtomicUsize::new(0),
            telemetry_down: AtomicBool::new(false),
            reject_commands: AtomicBool::new(false),
        })
    }

    fn set_alt(&self, alt: f64) {
        let mut state = self.state.lock().unwrap();
        state.location.alt = alt;
    }

    fn move_to(&self, location: Location) {
        self.state.lock().unwrap().location = location;
    }

    fn commands(&self) -> Vec<AvoidanceCommand> {
        self.sent.lock().unwrap().iter().map(|c| c.command.clone()).collect()
    }
}

impl Plane for MockPlane {
    fn state(&self) -> Result<PlaneState, LinkError> {
        if self.telemetry_down.load(Ordering::SeqCst) {
            return Err(LinkError::NoTelemetry);
        }
        Ok(self.state.lock().unwrap().clone())
    }

    fn send_command(&self, command: &Command) -> Result<(), LinkError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_commands.load(Ordering::SeqCst) {
            return Err(LinkError::Rejected("busy".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        match &command.command {
            AvoidanceCommand::InsertDodge { waypoint, .. } => state.next_waypoint = *waypoint,
            AvoidanceCommand::ResumeRoute { waypoint } => state.next_waypoint = *waypoint,
        }
        self.sent.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Tower 10 m right of the route, 1 km out, spanning 80..120 m.
fn registry_with_tower() -> Arc<ObstacleRegistry> {
    let registry = ObstacleRegistry::default();
    registry
        .register_static("tower", at(10.0, 1000.0, 100.0), 20.0, 40.0)
        .unwrap();
    Arc::new(registry)
}

fn spawn(plane: &Arc<MockPlane>, registry: Arc<ObstacleRegistry>) -> AvoidanceMonitor {
    let plane: Arc<dyn Plane> = plane.clone();
    AvoidanceMonitor::spawn(plane, registry, MonitorConfig::default())
}

#[tokio::test(start_paused = true)]
async fn never_arms_below_takeoff_altitude() {
    let plane = MockPlane::new(20.0);
    let monitor = spawn(&plane, registry_with_tower());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(monitor.state(), MonitorState::Inactive);
    assert!(plane.commands().is_empty());
    assert_eq!(plane.send_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn low_sample_resets_the_takeoff_debounce() {
    let plane = MockPlane::new(100.0);
    let monitor = spawn(&plane, Arc::new(ObstacleRegistry::default()));

    // Samples at 0 and 500 ms are high, 1000 ms is low.
    sleep(Duration::from_millis(600)).await;
    plane.set_alt(10.0);
    sleep(Duration::from_millis(500)).await;
    plane.set_alt(100.0);

    // High again at 1500 and 2000 ms: only two in a row so far.
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(monitor.state(), MonitorState::Inactive);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(monitor.state(), MonitorState::Armed);
}

#[tokio::test(start_paused = true)]
async fn failed_reads_also_reset_the_takeoff_debounce() {
    let plane = MockPlane::new(100.0);
    plane.telemetry_down.store(true, Ordering::SeqCst);
    let monitor = spawn(&plane, Arc::new(ObstacleRegistry::default()));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(monitor.state(), MonitorState::Inactive);

    plane.telemetry_down.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(1600)).await;
    assert_eq!(monitor.state(), MonitorState::Armed);
}

#[tokio::test(start_paused = true)]
async fn dodges_then_resumes_once_past_the_obstacle() {
    let plane = MockPlane::new(100.0);
    let original = plane.state.lock().unwrap().next_waypoint;
    let monitor = spawn(&plane, registry_with_tower());

    sleep(Duration::from_millis(1250)).await;
    assert_eq!(monitor.state(), MonitorState::Armed);

    let commands = plane.commands();
    assert_eq!(commands.len(), 1, "{commands:?}");
    match &commands[0] {
        AvoidanceCommand::InsertDodge {
            obstacle_id, side, ..
        } => {
            assert_eq!(obstacle_id, "tower");
            assert_eq!(*side, DodgeSide::Left);
        }
        other => panic!("expected a dodge, got {other:?}"),
    }

    // Still short of the tower: the dodge is held, not repeated.
    sleep(Duration::from_millis(500)).await;
    assert_eq!(plane.commands().len(), 1);

    plane.move_to(at(-45.0, 1100.0, 100.0));
    sleep(Duration::from_millis(250)).await;
    let commands = plane.commands();
    assert_eq!(commands.len(), 2, "{commands:?}");
    assert_eq!(
        commands[1],
        AvoidanceCommand::ResumeRoute { waypoint: original }
    );

    sleep(Duration::from_secs(1)).await;
    assert_eq!(plane.commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn suspended_monitor_emits_nothing() {
    let plane = MockPlane::new(100.0);
    let monitor = spawn(&plane, registry_with_tower());
    monitor.stop_monitoring();

    sleep(Duration::from_secs(3)).await;
    assert_eq!(monitor.state(), MonitorState::Suspended);
    assert!(plane.commands().is_empty());

    monitor.stop_monitoring();
    assert_eq!(monitor.state(), MonitorState::Suspended);

    monitor.start_monitoring();
    assert_eq!(monitor.state(), MonitorState::Armed);
    sleep(Duration::from_millis(250)).await;
    assert_eq!(plane.commands().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn close_halts_the_loop_within_one_interval() {
    let plane = MockPlane::new(100.0);
    let monitor = spawn(&plane, Arc::new(ObstacleRegistry::default()));

    sleep(Duration::from_millis(1250)).await;
    assert_eq!(monitor.state(), MonitorState::Armed);

    monitor.close();
    monitor.close();
    assert_eq!(monitor.state(), MonitorState::Closed);
    tokio::time::timeout(Duration::from_millis(100), monitor.join())
        .await
        .expect("monitor loop still running after close");

    // Closed is terminal.
    monitor.start_monitoring();
    assert_eq!(monitor.state(), MonitorState::Closed);
    assert_eq!(plane.send_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn close_before_takeoff_stops_waiting() {
    let plane = MockPlane::new(0.0);
    let monitor = spawn(&plane, registry_with_tower());

    sleep(Duration::from_millis(700)).await;
    monitor.close();
    tokio::time::timeout(Duration::from_millis(500), monitor.join())
        .await
        .expect("monitor loop still waiting for takeoff after close");
    assert_eq!(monitor.state(), MonitorState::Closed);
}

#[tokio::test(start_paused = true)]
async fn link_loss_keeps_the_last_state_and_retries_commands() {
    let plane = MockPlane::new(100.0);
    plane.reject_commands.store(true, Ordering::SeqCst);
    let monitor = spawn(&plane, registry_with_tower());

    sleep(Duration::from_millis(1250)).await;
    assert_eq!(monitor.state(), MonitorState::Armed);
    assert!(plane.send_attempts.load(Ordering::SeqCst) >= 2);
    assert!(plane.commands().is_empty());

    // Telemetry drops out too; the loop keeps deciding on the last snapshot.
    plane.telemetry_down.store(true, Ordering::SeqCst);
    plane.reject_commands.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(250)).await;

    let commands = plane.commands();
    assert_eq!(commands.len(), 1);
    assert!(matches!(commands[0], AvoidanceCommand::InsertDodge { .. }));
}

#[tokio::test(start_paused = true)]
async fn traffic_is_dodged_once_its_feed_reports() {
    let plane = MockPlane::new(100.0);
    let registry = Arc::new(ObstacleRegistry::default());
    let feed = registry.register_moving("traffic", 8.0).unwrap();
    let monitor = spawn(&plane, registry);

    sleep(Duration::from_millis(1250)).await;
    assert_eq!(monitor.state(), MonitorState::Armed);
    assert!(plane.commands().is_empty());

    // Reported 15 m left of the route, 800 m out, level with the plane.
    feed.publish(at(-15.0, 800.0, 100.0));
    sleep(Duration::from_millis(150)).await;

    let commands = plane.commands();
    assert_eq!(commands.len(), 1, "{commands:?}");
    match &commands[0] {
        AvoidanceCommand::InsertDodge {
            obstacle_id, side, ..
        } => {
            assert_eq!(obstacle_id, "traffic");
            assert_eq!(*side, DodgeSide::Right);
        }
        other => panic!("expected a dodge, got {other:?}"),
    }

    // The traffic moves off the route: the monitor resumes.
    feed.publish(at(-400.0, 800.0, 100.0));
    sleep(Duration::from_millis(150)).await;
    let commands = plane.commands();
    assert_eq!(commands.len(), 2, "{commands:?}");
    assert!(matches!(commands[1], AvoidanceCommand::ResumeRoute { .. }));
}
