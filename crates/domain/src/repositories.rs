use async_trait::async_trait;
use chrono::{DateTime, Utc};
use willcall_core::WillCallResult;

use crate::models::{
    AccessToken, Appointment, AppointmentStatus, JobState, NewNotificationJob, NotificationJob,
    OrderRecord, TokenKind,
};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Upsert keyed on `order_nbr`; a later sync for the same order replaces
    /// the stored fields.
    async fn upsert(&self, order: &OrderRecord) -> WillCallResult<()>;
    async fn get_by_order_nbr(&self, order_nbr: &str) -> WillCallResult<Option<OrderRecord>>;
    /// Orders for an appointment, in the requested order; missing numbers are
    /// silently absent from the result.
    async fn get_many(&self, order_nbrs: &[String]) -> WillCallResult<Vec<OrderRecord>>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn create(&self, appointment: &Appointment) -> WillCallResult<()>;
    async fn get_by_id(&self, id: &str) -> WillCallResult<Option<Appointment>>;
    async fn update(&self, appointment: &Appointment) -> WillCallResult<()>;
    async fn update_status(&self, id: &str, status: AppointmentStatus) -> WillCallResult<()>;
    /// Appointments in one of `statuses` whose `end_at` falls within
    /// `[from, to)`. Used by the no-show sweep.
    async fn find_ending_between(
        &self,
        statuses: &[AppointmentStatus],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> WillCallResult<Vec<Appointment>>;
}

#[async_trait]
pub trait NotificationJobRepository: Send + Sync {
    /// Idempotent enqueue: insert a Pending row keyed by the derived
    /// idempotency key, or return the existing row unchanged on conflict.
    async fn enqueue(&self, job: &NewNotificationJob) -> WillCallResult<NotificationJob>;
    async fn get_by_id(&self, id: i64) -> WillCallResult<Option<NotificationJob>>;
    /// Pending jobs with `scheduled_at <= now`, oldest due first.
    async fn get_due(&self, now: DateTime<Utc>, limit: i64)
        -> WillCallResult<Vec<NotificationJob>>;
    async fn get_by_appointment(&self, appointment_id: &str)
        -> WillCallResult<Vec<NotificationJob>>;
    async fn count_sent_for_appointment(&self, appointment_id: &str) -> WillCallResult<i64>;
    /// Cancel every still-Pending job for the appointment; returns how many
    /// rows changed.
    async fn cancel_pending_for_appointment(&self, appointment_id: &str) -> WillCallResult<u64>;
    async fn mark_sent(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()>;
    async fn mark_skipped(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()>;
    async fn mark_cancelled(&self, id: i64) -> WillCallResult<()>;
    async fn mark_failed(&self, id: i64, now: DateTime<Utc>) -> WillCallResult<()>;
}

#[async_trait]
pub trait JobStateRepository: Send + Sync {
    async fn get(&self, name: &str) -> WillCallResult<Option<JobState>>;
    /// Atomic conditional claim: succeeds (and stamps `last_run_at = now`)
    /// only when no run is recorded on-or-after `business_day_start`. A
    /// single compare-and-swap, not check-then-act, so two overlapping
    /// sweepers cannot both claim the same business day.
    async fn try_claim(
        &self,
        name: &str,
        business_day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WillCallResult<bool>;
}

#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    /// Revoke all active tokens for the owner and insert the replacement in
    /// one transaction, so there is never a zero-active-token window.
    async fn rotate(
        &self,
        kind: TokenKind,
        owner_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> WillCallResult<AccessToken>;
    async fn get_active(
        &self,
        kind: TokenKind,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> WillCallResult<Option<AccessToken>>;
}
