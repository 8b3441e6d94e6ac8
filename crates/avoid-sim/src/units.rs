//! Unit conversions for operator-facing input and output.
//!
//! Angles convert between decimal degrees, radians and degrees-minutes-seconds
//! strings such as `38° 8' 40.5600" N`. Distances convert between feet and
//! meters, speeds between knots and meters per second.

use thiserror::Error;

const METERS_PER_FOOT: f64 = 0.3048;
const KNOTS_PER_MPS: f64 = 1.943_84;
const MPS_PER_KNOT: f64 = 0.514_444;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("empty coordinate")]
    Empty,
    #[error("coordinate {0:?} must end in N, S, E or W")]
    MissingHemisphere(String),
    #[error("coordinate {0:?} needs degrees, minutes and seconds")]
    MissingField(String),
    #[error("invalid number {0:?} in coordinate")]
    BadNumber(String),
    #[error("coordinate {0:?} is not finite")]
    NotFinite(String),
}

/// Which hemisphere letters a DMS string uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Lat,
    Lon,
}

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Format decimal degrees as `D° M' S.SSSS" H`.
pub fn deg_to_dms(degrees: f64, axis: Axis) -> String {
    let hemisphere = match (axis, degrees >= 0.0) {
        (Axis::Lat, true) => 'N',
        (Axis::Lat, false) => 'S',
        (Axis::Lon, true) => 'E',
        (Axis::Lon, false) => 'W',
    };
    // Round once, in ten-thousandths of a second, so seconds never print as 60.
    let total = (degrees.abs() * 3600.0 * 10_000.0).round() as u64;
    let deg = total / (3600 * 10_000);
    let min = total / (60 * 10_000) % 60;
    let sec = (total % (60 * 10_000)) as f64 / 10_000.0;
    format!("{}° {}' {:.4}\" {}", deg, min, sec, hemisphere)
}

pub fn rad_to_dms(radians: f64, axis: Axis) -> String {
    deg_to_dms(rad_to_deg(radians), axis)
}

/// Parse a DMS string into signed decimal degrees. Any run of non-numeric
/// characters separates the fields; the last character is the hemisphere.
pub fn dms_to_deg(dms: &str) -> Result<f64, UnitError> {
    let dms = dms.trim();
    let hemisphere = dms.chars().last().ok_or(UnitError::Empty)?;
    let sign = match hemisphere.to_ascii_uppercase() {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return Err(UnitError::MissingHemisphere(dms.to_string())),
    };

    let body = &dms[..dms.len() - hemisphere.len_utf8()];
    let fields = body
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| UnitError::BadNumber(field.to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let &[deg, min, sec] = fields.as_slice() else {
        return Err(UnitError::MissingField(dms.to_string()));
    };
    Ok(sign * (deg + min / 60.0 + sec / 3600.0))
}

pub fn dms_to_rad(dms: &str) -> Result<f64, UnitError> {
    dms_to_deg(dms).map(deg_to_rad)
}

/// Decimal degrees or a DMS string, for CLI arguments.
pub fn parse_degrees(input: &str) -> Result<f64, UnitError> {
    match input.trim().parse::<f64>() {
        Ok(degrees) if degrees.is_finite() => Ok(degrees),
        Ok(_) => Err(UnitError::NotFinite(input.to_string())),
        Err(_) => dms_to_deg(input),
    }
}

pub fn feet(meters: f64) -> f64 {
    meters / METERS_PER_FOOT
}

pub fn meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

pub fn knots(meters_per_second: f64) -> f64 {
    meters_per_second * KNOTS_PER_MPS
}

pub fn meters_per_second(knots: f64) -> f64 {
    knots * MPS_PER_KNOT
}
