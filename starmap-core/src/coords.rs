//! Latitude/longitude text parsing and the DMM display form.
//!
//! Two input shapes are understood: signed decimal degrees (`-80.1204`) and
//! degrees + decimal minutes with a direction letter (`N32°55.93211′`). The
//! formatter emits `N32° 55′.93211′`, which the parser also reads back.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed number of decimal places on the minutes part of the display form.
pub const MINUTE_DECIMALS: u32 = 5;
const MINUTE_SCALE: f64 = 100_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Lat,
    Lon,
}

impl Axis {
    /// Largest absolute value allowed on this axis.
    pub fn limit(self) -> f64 {
        match self {
            Axis::Lat => 90.0,
            Axis::Lon => 180.0,
        }
    }

    fn positive(self) -> char {
        match self {
            Axis::Lat => 'N',
            Axis::Lon => 'E',
        }
    }

    fn negative(self) -> char {
        match self {
            Axis::Lat => 'S',
            Axis::Lon => 'W',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Lat => write!(f, "latitude"),
            Axis::Lon => write!(f, "longitude"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate is empty")]
    Empty,
    #[error("unrecognized coordinate format: {0}")]
    Malformed(String),
    #[error("{axis} {value} is out of range")]
    OutOfRange { axis: Axis, value: f64 },
    #[error("direction {dir} does not apply to {axis}")]
    WrongDirection { axis: Axis, dir: char },
}

/// Parse user-entered coordinate text into signed decimal degrees.
pub fn parse_coordinate(text: &str, axis: Axis) -> Result<f64, CoordinateError> {
    let t = text.trim();
    if t.is_empty() {
        return Err(CoordinateError::Empty);
    }
    let value = match t.trim_end_matches('°').parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        Ok(_) => return Err(CoordinateError::Malformed(t.to_string())),
        Err(_) => parse_dmm(t, axis)?,
    };
    if value.abs() > axis.limit() {
        return Err(CoordinateError::OutOfRange { axis, value });
    }
    Ok(value)
}

fn is_minute_mark(c: char) -> bool {
    matches!(c, '′' | '\'' | '’')
}

fn is_degree_mark(c: char) -> bool {
    matches!(c, '°' | 'º' | 'd' | 'D')
}

fn parse_dmm(t: &str, axis: Axis) -> Result<f64, CoordinateError> {
    let malformed = || CoordinateError::Malformed(t.to_string());
    let compact: String = t.chars().filter(|c| !c.is_whitespace()).collect();

    // Direction letter either leads (N32°…) or trails (32°…N).
    let first = compact.chars().next().ok_or_else(malformed)?;
    let last = compact.chars().last().ok_or_else(malformed)?;
    let (dir, body) = if first.is_ascii_alphabetic() {
        (first.to_ascii_uppercase(), &compact[first.len_utf8()..])
    } else if last.is_ascii_alphabetic() {
        (
            last.to_ascii_uppercase(),
            &compact[..compact.len() - last.len_utf8()],
        )
    } else {
        return Err(malformed());
    };
    let sign = if dir == axis.positive() {
        1.0
    } else if dir == axis.negative() {
        -1.0
    } else if matches!(dir, 'N' | 'S' | 'E' | 'W') {
        return Err(CoordinateError::WrongDirection { axis, dir });
    } else {
        return Err(malformed());
    };

    let body = body.trim_end_matches(is_minute_mark);
    let sep = body.find(is_degree_mark).ok_or_else(malformed)?;
    let sep_len = body[sep..].chars().next().map(char::len_utf8).unwrap_or(1);
    let deg_str = &body[..sep];
    // Display form puts a minute mark between whole and fractional minutes.
    let min_str: String = body[sep + sep_len..]
        .chars()
        .filter(|c| !is_minute_mark(*c))
        .collect();

    if deg_str.is_empty() || !deg_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if min_str.is_empty()
        || !min_str.chars().all(|c| c.is_ascii_digit() || c == '.')
        || min_str.matches('.').count() > 1
        || min_str.starts_with('.')
    {
        return Err(malformed());
    }
    let degrees: f64 = deg_str.parse::<u32>().map_err(|_| malformed())? as f64;
    let minutes: f64 = min_str.parse().map_err(|_| malformed())?;
    if minutes >= 60.0 {
        return Err(malformed());
    }
    Ok(sign * (degrees + minutes / 60.0))
}

/// Render decimal degrees in the `N32° 55′.93211′` display form.
pub fn format_coordinate(value: f64, axis: Axis) -> String {
    let dir = if value < 0.0 {
        axis.negative()
    } else {
        axis.positive()
    };
    let abs = value.abs();
    let mut degrees = abs.trunc() as u32;
    let mut scaled = ((abs - degrees as f64) * 60.0 * MINUTE_SCALE).round() as u64;
    let full_degree = 60 * MINUTE_SCALE as u64;
    if scaled >= full_degree {
        degrees += 1;
        scaled -= full_degree;
    }
    let whole = scaled / MINUTE_SCALE as u64;
    let frac = scaled % MINUTE_SCALE as u64;
    format!(
        "{dir}{degrees}° {whole}′.{frac:0width$}′",
        width = MINUTE_DECIMALS as usize
    )
}
