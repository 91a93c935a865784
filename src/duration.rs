use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Formats a minute count as `"{h}h {m}m"` with an approximate day figure.
///
/// The day figure uses `standard_daily_min` as the length of a day and is
/// omitted for zero durations (or a zero-length day).
pub fn format_minutes(total: i64, standard_daily_min: u32) -> String {
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.unsigned_abs();
    let hours = abs / 60;
    let minutes = abs % 60;

    let mut out = format!("{}{}h {}m", sign, hours, minutes);
    if abs > 0 && standard_daily_min > 0 {
        let days = abs as f64 / standard_daily_min as f64;
        out.push_str(&format!(" (≈{}{:.1}d)", sign, days));
    }
    out
}

/// Converts a day/hour/minute triple to minutes, a day being `standard_daily_min` long.
///
/// Totals that do not fit in a `u32` are rejected.
pub fn parse_duration(days: u32, hours: u32, minutes: u32, standard_daily_min: u32) -> Result<u32> {
    days.checked_mul(standard_daily_min)
        .and_then(|m| hours.checked_mul(60).and_then(|h| m.checked_add(h)))
        .and_then(|m| m.checked_add(minutes))
        .ok_or_else(|| {
            Error::Invalid(format!(
                "Duration of {}d {}h {}m is too large.",
                days, hours, minutes
            ))
        })
}

/// Splits minutes into whole workdays, hours and minutes.
pub fn split_minutes(total: u32, standard_daily_min: u32) -> (u32, u32, u32) {
    let (days, rest) = if standard_daily_min > 0 {
        (total / standard_daily_min, total % standard_daily_min)
    } else {
        (0, total)
    };
    (days, rest / 60, rest % 60)
}

/// Signed number of days from `today` to `date`.
pub fn relative_days(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}
