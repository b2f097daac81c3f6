use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton row per named batch job, used for at-most-once-per-day gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub name: String,
    pub last_run_at: DateTime<Utc>,
}

/// Fixed name of the no-show sweep's JobState row.
pub const NO_SHOW_SWEEP_JOB: &str = "no_show_sweep";
