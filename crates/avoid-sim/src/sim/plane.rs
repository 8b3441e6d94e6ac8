//! Kinematic fixed-wing model behind the autopilot link.
//!
//! Flies a waypoint route at constant airspeed with a bank-limited turn rate
//! and a fixed climb rate. A dodge waypoint, when inserted, is flown before
//! the rest of the route. Reported altitude carries sensor noise.

use std::collections::VecDeque;
use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use avoid_core::models::{AvoidanceCommand, Command, Location, Offset, PlaneState};
use avoid_core::spatial::{normalize_angle, wrap_angle, GeoFrame};
use avoid_core::turn::TurnPerformance;
use avoid_monitor::{LinkError, Plane};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct SimPlaneConfig {
    pub airspeed_mps: f64,
    pub climb_rate_mps: f64,
    /// Peak altitude noise added to reported telemetry
    pub altitude_noise_m: f64,
    /// A waypoint counts as reached inside this horizontal distance
    pub arrival_radius_m: f64,
    pub performance: TurnPerformance,
}

impl Default for SimPlaneConfig {
    fn default() -> Self {
        Self {
            airspeed_mps: 20.0,
            climb_rate_mps: 5.0,
            altitude_noise_m: 0.5,
            arrival_radius_m: 30.0,
            performance: TurnPerformance::default(),
        }
    }
}

struct Flight {
    location: Location,
    heading: f64,
    pitch: f64,
    roll: f64,
    route: VecDeque<Location>,
    dodge: Option<Location>,
    commands: Vec<Command>,
}

impl Flight {
    fn target(&self) -> Option<Location> {
        self.dodge.or_else(|| self.route.front().copied())
    }
}

pub struct SimPlane {
    frame: GeoFrame,
    config: SimPlaneConfig,
    home: Location,
    connected: AtomicBool,
    flight: Mutex<Flight>,
}

impl SimPlane {
    /// Plane sitting at `home` pointing along `heading`, about to fly `route`.
    pub fn new(home: Location, heading: f64, route: Vec<Location>, config: SimPlaneConfig) -> Self {
        Self {
            frame: GeoFrame::WGS84,
            config,
            home,
            connected: AtomicBool::new(true),
            flight: Mutex::new(Flight {
                location: home,
                heading: normalize_angle(heading),
                pitch: 0.0,
                roll: 0.0,
                route: route.into(),
                dodge: None,
                commands: Vec::new(),
            }),
        }
    }

    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&self, dt: f64) {
        let mut flight = self.flight();
        let Some(target) = flight.target() else {
            flight.roll = 0.0;
            flight.pitch = 0.0;
            return;
        };

        let airspeed = self.config.airspeed_mps;
        let performance = &self.config.performance;
        let max_rate = performance.accel_grav * performance.banking_angle_rad.tan() / airspeed;

        let desired = self.frame.bearing(&flight.location, &target);
        let error = wrap_angle(desired - flight.heading);
        let turn = error.clamp(-max_rate * dt, max_rate * dt);
        flight.heading = normalize_angle(flight.heading + turn);
        flight.roll = if turn == 0.0 {
            0.0
        } else {
            performance.banking_angle_rad * turn / (max_rate * dt)
        };

        let max_climb = self.config.climb_rate_mps * dt;
        let climb = (target.alt - flight.location.alt).clamp(-max_climb, max_climb);
        let run = airspeed * dt;
        flight.pitch = climb.atan2(run);

        let offset = Offset::new(run * flight.heading.sin(), run * flight.heading.cos(), climb);
        flight.location = self.frame.location_at(&flight.location, &offset);

        if self.reached(&flight, &target) {
            if flight.dodge.take().is_none() {
                flight.route.pop_front();
            }
            tracing::debug!("Reached waypoint, {} left on route", flight.route.len());
        }
    }

    /// Within the arrival radius, or passed abeam close enough that turning
    /// back for it would mean circling.
    fn reached(&self, flight: &Flight, target: &Location) -> bool {
        let distance = self.frame.horizontal_distance(&flight.location, target);
        if distance < self.config.arrival_radius_m {
            return true;
        }
        let behind = wrap_angle(self.frame.bearing(&flight.location, target) - flight.heading).abs()
            > FRAC_PI_2;
        let turn_diameter = 2.0 * self.config.performance.turning_radius(self.config.airspeed_mps);
        behind && distance < turn_diameter
    }

    pub fn location(&self) -> Location {
        self.flight().location
    }

    pub fn heading(&self) -> f64 {
        self.flight().heading
    }

    pub fn dodge_waypoint(&self) -> Option<Location> {
        self.flight().dodge
    }

    pub fn route_len(&self) -> usize {
        self.flight().route.len()
    }

    /// Route flown to the end.
    pub fn is_finished(&self) -> bool {
        self.flight().target().is_none()
    }

    /// Commands accepted so far, oldest first.
    pub fn commands(&self) -> Vec<Command> {
        self.flight().commands.clone()
    }

    /// Simulate the telemetry radio dropping out or coming back.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Plane for SimPlane {
    fn state(&self) -> Result<PlaneState, LinkError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(LinkError::Disconnected);
        }
        let flight = self.flight();

        let noise = self.config.altitude_noise_m;
        let mut location = flight.location;
        if noise > 0.0 {
            location.alt += rand::rng().random_range(-noise..noise);
        }

        Ok(PlaneState {
            location,
            heading: flight.heading,
            airspeed: self.config.airspeed_mps,
            pitch: flight.pitch,
            roll: flight.roll,
            next_waypoint: flight.target().unwrap_or(self.home),
            home_location: self.home,
        })
    }

    fn send_command(&self, command: &Command) -> Result<(), LinkError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(LinkError::Disconnected);
        }
        let mut flight = self.flight();
        match &command.command {
            AvoidanceCommand::InsertDodge { waypoint, .. } => {
                if !waypoint.is_finite() {
                    return Err(LinkError::Rejected("non-finite dodge waypoint".to_string()));
                }
                flight.dodge = Some(*waypoint);
            }
            AvoidanceCommand::ResumeRoute { waypoint } => {
                flight.dodge = None;
                if flight.route.front() != Some(waypoint) {
                    flight.route.push_front(*waypoint);
                }
            }
        }
        flight.commands.push(command.clone());
        Ok(())
    }
}
