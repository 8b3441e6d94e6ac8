//! Simulation tools for the obstacle avoidance monitor.
//!
//! This crate provides:
//! - a kinematic simulated plane behind the autopilot link
//! - scripted scenarios with towers and traffic
//! - unit conversions for operator input and output

pub mod sim;
pub mod units;
