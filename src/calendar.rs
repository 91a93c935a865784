//! Working-calendar model and completion-date projection.
//!
//! Everything here works on `NaiveDate` calendar dates. `today` is always
//! passed in by the caller so the projection is reproducible.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, warn};

use crate::models::{CalendarOverride, CalendarSettings, HolidayCache};

const HOLIDAY_CACHE_MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Returns true when `date` is in the cached public-holiday list and holidays are enabled.
pub fn is_holiday(date: NaiveDate, settings: &CalendarSettings) -> bool {
    if !settings.use_japan_holidays {
        return false;
    }
    settings
        .holiday_cache
        .as_ref()
        .is_some_and(|cache| cache.dates.contains(&date))
}

/// Minutes available for work on `date`.
///
/// An override for the date wins outright; otherwise non-working weekdays and
/// holidays yield 0 and any other day yields the standard day length.
pub fn available_minutes(
    date: NaiveDate,
    settings: &CalendarSettings,
    overrides: &[CalendarOverride],
) -> u32 {
    if let Some(o) = overrides.iter().find(|o| o.date == date) {
        return o.available_min;
    }
    let weekday = date.weekday().num_days_from_sunday();
    if !settings.work_days.contains(&weekday) {
        return 0;
    }
    if is_holiday(date, settings) {
        return 0;
    }
    settings.standard_daily_min
}

/// Outcome of a completion projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Nothing remains; the caller decides how to show it.
    AlreadyComplete,
    /// The remaining work is finished on this date.
    CompletesOn(NaiveDate),
    /// The day limit was reached with work still left. Holds the last evaluated date.
    Exhausted(NaiveDate),
}

impl Projection {
    /// The projected date, with `AlreadyComplete` mapped to `today`.
    pub fn date_or(&self, today: NaiveDate) -> NaiveDate {
        match *self {
            Projection::AlreadyComplete => today,
            Projection::CompletesOn(d) | Projection::Exhausted(d) => d,
        }
    }

    /// `YYYY-MM-DD` rendering of [`Projection::date_or`].
    pub fn to_iso(&self, today: NaiveDate) -> String {
        self.date_or(today).format("%Y-%m-%d").to_string()
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Projection::Exhausted(_))
    }
}

/// Walks forward from `today` consuming each day's available minutes until
/// `remaining_min` is used up.
///
/// `today` itself counts as the first candidate day. A day that provides
/// exactly the remaining minutes is the completion day. At most `day_limit`
/// days are evaluated.
pub fn project_completion(
    remaining_min: i64,
    settings: &CalendarSettings,
    overrides: &[CalendarOverride],
    today: NaiveDate,
    day_limit: u32,
) -> Projection {
    if remaining_min <= 0 {
        return Projection::AlreadyComplete;
    }

    let mut remaining = remaining_min;
    let mut current = today;
    for evaluated in 0..day_limit {
        if evaluated > 0 {
            current += Duration::days(1);
        }
        remaining -= i64::from(available_minutes(current, settings, overrides));
        if remaining <= 0 {
            debug!(%today, completes_on = %current, days = evaluated + 1, "Projected completion");
            return Projection::CompletesOn(current);
        }
    }

    warn!(
        remaining_min,
        left_over = remaining,
        day_limit,
        last_day = %current,
        "Completion projection hit its day limit; calendar has too little availability"
    );
    Projection::Exhausted(current)
}

impl HolidayCache {
    /// Builds a cache from a fetched holiday list, deriving the covered years.
    pub fn from_dates(mut dates: Vec<NaiveDate>, fetched_at_ms: i64, source: &str) -> Self {
        dates.sort();
        dates.dedup();
        let mut years: Vec<i32> = dates.iter().map(|d| d.year()).collect();
        years.dedup();
        HolidayCache {
            dates,
            last_updated: fetched_at_ms,
            source: source.to_string(),
            years,
        }
    }
}

/// Whether the holiday cache should be fetched again.
///
/// A refresh is due when holidays are enabled and the cache is missing or
/// empty, does not cover both the current and the next year, or is older than
/// a week.
pub fn needs_holiday_refresh(settings: &CalendarSettings, today: NaiveDate, now_ms: i64) -> bool {
    if !settings.use_japan_holidays {
        return false;
    }
    let cache = match &settings.holiday_cache {
        Some(c) if !c.dates.is_empty() && !c.years.is_empty() => c,
        _ => return true,
    };
    let year = today.year();
    if !cache.years.contains(&year) || !cache.years.contains(&(year + 1)) {
        return true;
    }
    now_ms - cache.last_updated > HOLIDAY_CACHE_MAX_AGE_MS
}
