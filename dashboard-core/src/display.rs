//! Formatting of report fields for display.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

/// Nearest whole degree, halves rounded up (`-2.5` → `-2`).
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    // Avoid printing "-0".
    if rounded == 0.0 { 0.0 } else { rounded }
}

pub fn temperature(celsius: f64) -> String {
    format!("{:.0}°C", round_half_up(celsius))
}

/// One decimal place; an exact tie rounds up (`2.25` → `2.3`).
pub fn wind_speed(mps: f64) -> String {
    let tenths = mps * 10.0;
    // Only a tie if the product is exact, else 0.35 (really 0.3499..) would count.
    let exact = mps.mul_add(10.0, -tenths) == 0.0;
    if exact && (tenths - tenths.floor()) == 0.5 {
        format!("{:.1} m/s", (tenths.floor() + 1.0) / 10.0)
    } else {
        format!("{mps:.1} m/s")
    }
}

pub fn humidity(pct: u8) -> String {
    format!("{pct}%")
}

pub fn pressure(hpa: u32) -> String {
    format!("{hpa} hPa")
}

/// Observation time in the local time zone.
pub fn timestamp(unix_secs: i64) -> String {
    timestamp_in(unix_secs, &Local)
}

pub fn timestamp_in<Tz>(unix_secs: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match unix_secs.checked_mul(1000).and_then(DateTime::from_timestamp_millis) {
        Some(utc) => utc.with_timezone(tz).format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => "unknown".to_string(),
    }
}
