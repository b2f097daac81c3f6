//! Send-eligibility gates applied by the dispatch loop.

use chrono::{DateTime, Utc};
use willcall_core::business_time;
use willcall_core::WillCallResult;
use willcall_domain::NotificationJobRepository;

/// Default per-appointment lifetime cap on Sent notifications.
pub const DEFAULT_NOTIFICATION_CAP: i64 = 10;

/// A job whose *scheduled* delivery time falls in quiet hours is skipped,
/// not rescheduled, even when the runner processes it later during allowed
/// hours.
pub fn should_skip_for_quiet_hours(scheduled_at: DateTime<Utc>) -> bool {
    business_time::is_quiet_hours(scheduled_at)
}

/// Lifetime cap across all notification types for one appointment, guarding
/// against runaway messaging from repeated reschedules.
pub async fn has_reached_notification_cap(
    job_repo: &dyn NotificationJobRepository,
    appointment_id: &str,
    cap: i64,
) -> WillCallResult<bool> {
    let sent = job_repo.count_sent_for_appointment(appointment_id).await?;
    Ok(sent >= cap)
}
