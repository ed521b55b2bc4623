//! Local Sidereal Time from a calendar date and an observer longitude.

use chrono::{Datelike, NaiveDate};

/// Julian Date of the J2000.0 epoch.
pub const J2000: f64 = 2_451_545.0;
/// Julian Date of 0000-12-31T00:00Z, i.e. the day before chrono's CE day 1.
const JD_CE_OFFSET: f64 = 1_721_424.5;

const GMST_AT_J2000_HOURS: f64 = 18.697_374_558;
const SIDEREAL_HOURS_PER_DAY: f64 = 24.065_709_824_419_08;

/// Strict `YYYY-MM-DD` parse.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Julian Date at midnight UTC of the given calendar day.
pub fn julian_date(date: NaiveDate) -> f64 {
    JD_CE_OFFSET + date.num_days_from_ce() as f64
}

/// Fold any hour value into `[0, 24)`.
pub fn wrap_hours(h: f64) -> f64 {
    let w = h.rem_euclid(24.0);
    // rem_euclid may round a tiny negative input up to exactly 24.0
    if w >= 24.0 { 0.0 } else { w }
}

/// Greenwich Mean Sidereal Time in hours for a Julian Date.
pub fn gmst_hours(jd: f64) -> f64 {
    wrap_hours(GMST_AT_J2000_HOURS + SIDEREAL_HOURS_PER_DAY * (jd - J2000))
}

pub fn lst_for_date(date: NaiveDate, longitude: f64) -> f64 {
    if !longitude.is_finite() {
        return f64::NAN;
    }
    wrap_hours(gmst_hours(julian_date(date)) + longitude / 15.0)
}

/// Local Sidereal Time in hours, or `NaN` when the date does not parse.
pub fn local_sidereal_time_hours(date_iso: &str, longitude: f64) -> f64 {
    match parse_iso_date(date_iso) {
        Some(date) => lst_for_date(date, longitude),
        None => f64::NAN,
    }
}
