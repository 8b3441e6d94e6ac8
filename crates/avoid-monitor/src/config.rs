//! Monitor configuration from environment.

use avoid_core::rules::AvoidanceRules;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Altitude the plane must exceed before the monitor arms (meters)
    pub takeoff_altitude_m: f64,
    /// Consecutive samples above `takeoff_altitude_m` required to arm
    pub takeoff_debounce_samples: u32,
    /// Altitude polling cadence while waiting for takeoff
    pub arming_interval: Duration,
    /// Evaluation cadence once armed
    pub armed_interval: Duration,
    pub rules: AvoidanceRules,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            takeoff_altitude_m: 30.0,
            takeoff_debounce_samples: 3,
            arming_interval: Duration::from_millis(500),
            armed_interval: Duration::from_millis(100),
            rules: AvoidanceRules::default(),
        }
    }
}

impl MonitorConfig {
    /// Defaults overridden by any `AVOID_*` variable that parses and is in range.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut rules = defaults.rules;

        rules.static_buffer_m =
            env_parse("AVOID_STATIC_BUFFER_M", is_distance).unwrap_or(rules.static_buffer_m);
        rules.moving_buffer_m =
            env_parse("AVOID_MOVING_BUFFER_M", is_distance).unwrap_or(rules.moving_buffer_m);
        rules.dodge_margin_m =
            env_parse("AVOID_DODGE_MARGIN_M", is_distance).unwrap_or(rules.dodge_margin_m);
        rules.resume_margin_m =
            env_parse("AVOID_RESUME_MARGIN_M", is_distance).unwrap_or(rules.resume_margin_m);
        rules.performance.banking_angle_rad = env_parse("AVOID_BANK_ANGLE_RAD", |v: &f64| {
            *v > 0.0 && *v < std::f64::consts::FRAC_PI_2
        })
        .unwrap_or(rules.performance.banking_angle_rad);

        Self {
            takeoff_altitude_m: env_parse("AVOID_TAKEOFF_ALT_M", |v: &f64| v.is_finite())
                .unwrap_or(defaults.takeoff_altitude_m),
            takeoff_debounce_samples: env_parse("AVOID_TAKEOFF_SAMPLES", |v: &u32| *v > 0)
                .unwrap_or(defaults.takeoff_debounce_samples),
            arming_interval: env_parse("AVOID_ARMING_INTERVAL_MS", |v: &u64| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.arming_interval),
            armed_interval: env_parse("AVOID_ARMED_INTERVAL_MS", |v: &u64| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.armed_interval),
            rules,
        }
    }
}

fn is_distance(value: &f64) -> bool {
    value.is_finite() && *value >= 0.0
}

fn env_parse<T: FromStr>(key: &str, valid: impl Fn(&T) -> bool) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => Some(value),
        _ => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
