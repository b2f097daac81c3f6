use std::sync::Arc;

use tracing::debug;
use willcall_core::WillCallResult;
use willcall_domain::{NewNotificationJob, NotificationJob, NotificationJobRepository};

/// Idempotent job creation keyed by (appointment, type, scheduled time).
///
/// The repository enforces uniqueness of the derived idempotency key with an
/// upsert whose conflict arm is a no-op, so retried or overlapping
/// orchestration calls collapse to exactly one persisted row.
pub struct JobScheduler {
    job_repo: Arc<dyn NotificationJobRepository>,
}

impl JobScheduler {
    pub fn new(job_repo: Arc<dyn NotificationJobRepository>) -> Self {
        Self { job_repo }
    }

    /// Returns the persisted job: newly created Pending on first call,
    /// the existing row unchanged on every call after.
    pub async fn enqueue_job(&self, request: &NewNotificationJob) -> WillCallResult<NotificationJob> {
        let job = self.job_repo.enqueue(request).await?;
        debug!(
            job_id = job.id,
            appointment_id = %job.appointment_id,
            kind = job.kind.as_str(),
            scheduled_at = %job.scheduled_at,
            "notification job enqueued"
        );
        Ok(job)
    }
}
