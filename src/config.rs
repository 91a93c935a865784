use serde::{Deserialize, Serialize};

/// Groups with fewer samples than this are flagged as small samples.
pub const SMALL_SAMPLE_THRESHOLD: usize = 3;

/// A deadline closer than this many days after the expected completion is "tense".
pub const TENSE_WINDOW_DAYS: i64 = 3;

/// Maximum number of calendar days the completion projector evaluates.
pub const PROJECTION_DAY_LIMIT: u32 = 1000;

/// Base duration used for a standard task with no recorded history.
pub const DEFAULT_MEDIAN_MIN: f64 = 120.0;

/// Business thresholds used by the estimator and the status classifier.
///
/// Stored alongside the data so a site can tune them; every field falls back
/// to the constant of the same name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    pub small_sample_threshold: usize,
    pub tense_window_days: i64,
    pub projection_day_limit: u32,
    pub default_median_min: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            small_sample_threshold: SMALL_SAMPLE_THRESHOLD,
            tense_window_days: TENSE_WINDOW_DAYS,
            projection_day_limit: PROJECTION_DAY_LIMIT,
            default_median_min: DEFAULT_MEDIAN_MIN,
        }
    }
}
