use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use willcall_core::WillCallResult;
use willcall_domain::{
    Appointment, AppointmentRepository, EmailSender, NotificationJob, NotificationJobRepository,
    OrderRepository, SmsSender,
};

use crate::{eligibility, payload};

/// Per-tick accounting for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub fetched: usize,
    pub sent: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub failed: usize,
}

enum JobOutcome {
    Sent,
    Skipped,
    Cancelled,
    Failed,
}

/// The dispatch loop. Each tick pulls a batch of due Pending jobs and
/// processes them strictly sequentially; sequential processing keeps the
/// notification cap check race-free without a transactional
/// increment-and-check.
pub struct JobRunner {
    job_repo: Arc<dyn NotificationJobRepository>,
    appointment_repo: Arc<dyn AppointmentRepository>,
    order_repo: Arc<dyn OrderRepository>,
    email_sender: Arc<dyn EmailSender>,
    sms_sender: Arc<dyn SmsSender>,
    notification_cap: i64,
    batch_size: i64,
}

impl JobRunner {
    pub fn new(
        job_repo: Arc<dyn NotificationJobRepository>,
        appointment_repo: Arc<dyn AppointmentRepository>,
        order_repo: Arc<dyn OrderRepository>,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
        notification_cap: i64,
        batch_size: i64,
    ) -> Self {
        Self {
            job_repo,
            appointment_repo,
            order_repo,
            email_sender,
            sms_sender,
            notification_cap,
            batch_size,
        }
    }

    pub async fn run_tick(&self, now: DateTime<Utc>) -> WillCallResult<TickSummary> {
        let due = self.job_repo.get_due(now, self.batch_size).await?;
        let mut summary = TickSummary {
            fetched: due.len(),
            ..Default::default()
        };

        for job in due {
            match self.process_job(&job, now).await {
                Ok(JobOutcome::Sent) => summary.sent += 1,
                Ok(JobOutcome::Skipped) => summary.skipped += 1,
                Ok(JobOutcome::Cancelled) => summary.cancelled += 1,
                Ok(JobOutcome::Failed) => summary.failed += 1,
                Err(e) => {
                    // Store-level failure while recording an outcome; the
                    // job stays as-is and the loop moves on.
                    summary.failed += 1;
                    error!(job_id = job.id, error = %e, "failed to record job outcome");
                }
            }
        }

        if summary.fetched > 0 {
            info!(
                fetched = summary.fetched,
                sent = summary.sent,
                skipped = summary.skipped,
                cancelled = summary.cancelled,
                failed = summary.failed,
                "dispatch tick complete"
            );
        }
        Ok(summary)
    }

    async fn process_job(
        &self,
        job: &NotificationJob,
        now: DateTime<Utc>,
    ) -> WillCallResult<JobOutcome> {
        // Gate on the job's scheduled time, not the wall clock: a job whose
        // delivery slot fell in quiet hours stays suppressed even when the
        // runner gets to it the next morning.
        if eligibility::should_skip_for_quiet_hours(job.scheduled_at) {
            self.job_repo.mark_skipped(job.id, now).await?;
            debug!(job_id = job.id, "skipped: scheduled inside quiet hours");
            return Ok(JobOutcome::Skipped);
        }

        let Some(appointment) = self.appointment_repo.get_by_id(&job.appointment_id).await? else {
            self.job_repo.mark_failed(job.id, now).await?;
            error!(
                job_id = job.id,
                appointment_id = %job.appointment_id,
                "job references a missing appointment"
            );
            return Ok(JobOutcome::Failed);
        };

        if !job.payload.ignore_cap
            && eligibility::has_reached_notification_cap(
                self.job_repo.as_ref(),
                &job.appointment_id,
                self.notification_cap,
            )
            .await?
        {
            self.job_repo.mark_skipped(job.id, now).await?;
            debug!(job_id = job.id, "skipped: notification cap reached");
            return Ok(JobOutcome::Skipped);
        }

        // Stale reminder for an appointment that already ended: Cancelled,
        // not Skipped, so reporting can tell policy suppression from
        // staleness.
        if appointment.is_terminal() && job.kind.is_reminder() {
            self.job_repo.mark_cancelled(job.id).await?;
            debug!(
                job_id = job.id,
                status = appointment.status.as_str(),
                "cancelled: reminder for terminal appointment"
            );
            return Ok(JobOutcome::Cancelled);
        }

        match self.dispatch(job, &appointment).await {
            Ok(()) => {
                self.job_repo.mark_sent(job.id, now).await?;
                Ok(JobOutcome::Sent)
            }
            Err(e) => {
                self.job_repo.mark_failed(job.id, now).await?;
                error!(job_id = job.id, error = %e, "notification dispatch failed");
                Ok(JobOutcome::Failed)
            }
        }
    }

    async fn dispatch(&self, job: &NotificationJob, appointment: &Appointment) -> WillCallResult<()> {
        // Hydrate live orders for snapshot fallback before rendering.
        let mut appointment = appointment.clone();
        if job.payload.order_nbrs.is_empty() && !appointment.order_nbrs.is_empty() {
            let orders = self.order_repo.get_many(&appointment.order_nbrs).await?;
            appointment.order_nbrs = orders.into_iter().map(|o| o.order_nbr).collect();
        }

        let message = payload::render(job.id, job.kind, &job.payload, &appointment)?;

        let send_email = job.channel.includes_email() && appointment.wants_email();
        let send_sms = job.channel.includes_sms() && appointment.wants_sms();

        if !send_email && !send_sms {
            warn!(
                job_id = job.id,
                appointment_id = %appointment.id,
                "no deliverable channel; marking sent with zero deliveries"
            );
            return Ok(());
        }

        if send_email {
            if let Some(to) = appointment.email_destination() {
                let outcome = self
                    .email_sender
                    .send_email(to, &message.subject, &message.html_body)
                    .await?;
                if outcome.skipped {
                    debug!(job_id = job.id, "email sender skipped delivery");
                }
            }
        }
        if send_sms {
            if let Some(to) = appointment.phone_destination() {
                let outcome = self.sms_sender.send_sms(to, &message.sms_body).await?;
                if outcome.skipped {
                    debug!(job_id = job.id, "sms sender skipped delivery");
                }
            }
        }
        Ok(())
    }
}
