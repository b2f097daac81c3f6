//! Maps appointment lifecycle events to notification job creation and
//! cancellation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};
use willcall_core::{business_time, WillCallResult};
use willcall_domain::{
    AccessTokenRepository, Appointment, EmailSender, LinkBuilder, NewNotificationJob,
    NotificationChannel, NotificationJob, NotificationJobRepository, NotificationPayload,
    NotificationType, SmsSender, TokenKind,
};

use crate::enqueue::JobScheduler;
use crate::payload;

/// How long a pickup link stays valid past the appointment end.
const TOKEN_TTL_DAYS: i64 = 30;

/// Actor context for a lifecycle event. Staff-initiated events bypass the
/// notification cap and tag the payload for downstream wording and audit.
#[derive(Debug, Clone, Copy)]
pub struct EventContext {
    pub notify_customer: bool,
    pub ignore_cap: bool,
    pub staff_initiated: bool,
}

impl EventContext {
    pub fn customer() -> Self {
        Self {
            notify_customer: true,
            ignore_cap: false,
            staff_initiated: false,
        }
    }

    pub fn staff() -> Self {
        Self {
            notify_customer: true,
            ignore_cap: true,
            staff_initiated: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct OrchestrationOutcome {
    pub enqueued: Vec<NotificationJob>,
    pub cancelled_pending: u64,
}

pub struct NotificationOrchestrator {
    scheduler: JobScheduler,
    job_repo: Arc<dyn NotificationJobRepository>,
    token_repo: Arc<dyn AccessTokenRepository>,
    link_builder: Arc<dyn LinkBuilder>,
    email_sender: Arc<dyn EmailSender>,
    sms_sender: Arc<dyn SmsSender>,
}

impl NotificationOrchestrator {
    pub fn new(
        job_repo: Arc<dyn NotificationJobRepository>,
        token_repo: Arc<dyn AccessTokenRepository>,
        link_builder: Arc<dyn LinkBuilder>,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
    ) -> Self {
        Self {
            scheduler: JobScheduler::new(job_repo.clone()),
            job_repo,
            token_repo,
            link_builder,
            email_sender,
            sms_sender,
        }
    }

    /// Scheduled: immediate confirmation plus 24h and 1h reminders, each
    /// only when its slot is still in the future.
    pub async fn appointment_scheduled(
        &self,
        appointment: &Appointment,
        ctx: EventContext,
        now: DateTime<Utc>,
    ) -> WillCallResult<OrchestrationOutcome> {
        if !ctx.notify_customer {
            return Ok(OrchestrationOutcome::default());
        }
        let link = self.ensure_link(appointment, now).await?;
        let mut outcome = OrchestrationOutcome::default();

        let base = self.base_payload(appointment, ctx, Some(link));
        outcome.enqueued.push(
            self.enqueue(appointment, NotificationType::ScheduledConfirm, now, base.clone())
                .await?,
        );
        for (kind, at) in reminder_slots(appointment) {
            if at > now {
                outcome
                    .enqueued
                    .push(self.enqueue(appointment, kind, at, base.clone()).await?);
            } else {
                debug!(
                    appointment_id = %appointment.id,
                    kind = kind.as_str(),
                    "reminder slot already past; not enqueued"
                );
            }
        }
        Ok(outcome)
    }

    /// Rescheduled: obsolete pending jobs are cancelled explicitly (the
    /// runner's terminal-status check never fires for a reschedule), then a
    /// notice and fresh reminders go out against the new times.
    pub async fn appointment_rescheduled(
        &self,
        appointment: &Appointment,
        old_start_at: DateTime<Utc>,
        old_end_at: DateTime<Utc>,
        ctx: EventContext,
        now: DateTime<Utc>,
    ) -> WillCallResult<OrchestrationOutcome> {
        if !ctx.notify_customer {
            return Ok(OrchestrationOutcome::default());
        }
        let cancelled = self
            .job_repo
            .cancel_pending_for_appointment(&appointment.id)
            .await?;
        let link = self.ensure_link(appointment, now).await?;
        let mut outcome = OrchestrationOutcome {
            cancelled_pending: cancelled,
            ..Default::default()
        };

        let mut notice = self.base_payload(appointment, ctx, Some(link));
        notice.old_start_at = Some(old_start_at);
        notice.old_end_at = Some(old_end_at);
        notice.new_start_at = Some(appointment.start_at);
        notice.new_end_at = Some(appointment.end_at);
        outcome.enqueued.push(
            self.enqueue(appointment, NotificationType::Rescheduled, now, notice.clone())
                .await?,
        );

        for (kind, at) in reminder_slots(appointment) {
            if at > now {
                outcome
                    .enqueued
                    .push(self.enqueue(appointment, kind, at, notice.clone()).await?);
            }
        }
        Ok(outcome)
    }

    /// Cancelled with customer notice. `notify_customer = false` makes the
    /// whole call a no-op; use [`silent_cancel`](Self::silent_cancel) to
    /// drop pending jobs without a notice.
    pub async fn appointment_cancelled(
        &self,
        appointment: &Appointment,
        reason: Option<&str>,
        ctx: EventContext,
        now: DateTime<Utc>,
    ) -> WillCallResult<OrchestrationOutcome> {
        if !ctx.notify_customer {
            return Ok(OrchestrationOutcome::default());
        }
        let cancelled = self
            .job_repo
            .cancel_pending_for_appointment(&appointment.id)
            .await?;
        let mut payload = self.base_payload(appointment, ctx, None);
        payload.cancel_reason = reason.map(str::to_string);

        let job = self
            .enqueue(appointment, NotificationType::Cancelled, now, payload)
            .await?;
        Ok(OrchestrationOutcome {
            enqueued: vec![job],
            cancelled_pending: cancelled,
        })
    }

    /// Always cancels pending jobs, never sends a cancellation notice.
    pub async fn silent_cancel(&self, appointment_id: &str) -> WillCallResult<u64> {
        let cancelled = self
            .job_repo
            .cancel_pending_for_appointment(appointment_id)
            .await?;
        info!(
            appointment_id = %appointment_id,
            cancelled,
            "silent cancel dropped pending jobs"
        );
        Ok(cancelled)
    }

    pub async fn appointment_completed(
        &self,
        appointment: &Appointment,
        ctx: EventContext,
        now: DateTime<Utc>,
    ) -> WillCallResult<OrchestrationOutcome> {
        if !ctx.notify_customer {
            return Ok(OrchestrationOutcome::default());
        }
        let payload = self.base_payload(appointment, ctx, None);
        let job = self
            .enqueue(appointment, NotificationType::Completed, now, payload)
            .await?;
        Ok(OrchestrationOutcome {
            enqueued: vec![job],
            cancelled_pending: 0,
        })
    }

    pub async fn appointment_ready(
        &self,
        appointment: &Appointment,
        ctx: EventContext,
        now: DateTime<Utc>,
    ) -> WillCallResult<OrchestrationOutcome> {
        if !ctx.notify_customer {
            return Ok(OrchestrationOutcome::default());
        }
        let link = self.ensure_link(appointment, now).await?;
        let payload = self.base_payload(appointment, ctx, Some(link));
        let job = self
            .enqueue(appointment, NotificationType::ReadyForPickup, now, payload)
            .await?;
        Ok(OrchestrationOutcome {
            enqueued: vec![job],
            cancelled_pending: 0,
        })
    }

    pub async fn order_list_changed(
        &self,
        appointment: &Appointment,
        ctx: EventContext,
        now: DateTime<Utc>,
    ) -> WillCallResult<OrchestrationOutcome> {
        if !ctx.notify_customer {
            return Ok(OrchestrationOutcome::default());
        }
        let payload = self.base_payload(appointment, ctx, None);
        let job = self
            .enqueue(appointment, NotificationType::OrderListChanged, now, payload)
            .await?;
        Ok(OrchestrationOutcome {
            enqueued: vec![job],
            cancelled_pending: 0,
        })
    }

    /// Terminal no-show notice used by the daily sweep: a direct send on
    /// each opted-in channel, independent of the cap and quiet-hours gates.
    pub async fn notify_no_show(&self, appointment: &Appointment) -> WillCallResult<()> {
        let message = payload::render_no_show(appointment);

        if appointment.wants_email() {
            if let Some(to) = appointment.email_destination() {
                if let Err(e) = self
                    .email_sender
                    .send_email(to, &message.subject, &message.html_body)
                    .await
                {
                    warn!(appointment_id = %appointment.id, error = %e, "no-show email failed");
                }
            }
        }
        if appointment.wants_sms() {
            if let Some(to) = appointment.phone_destination() {
                if let Err(e) = self.sms_sender.send_sms(to, &message.sms_body).await {
                    warn!(appointment_id = %appointment.id, error = %e, "no-show sms failed");
                }
            }
        }
        Ok(())
    }

    fn base_payload(
        &self,
        appointment: &Appointment,
        ctx: EventContext,
        link: Option<String>,
    ) -> NotificationPayload {
        NotificationPayload {
            order_nbrs: appointment.order_nbrs.clone(),
            link,
            ignore_cap: ctx.ignore_cap,
            staff_initiated: ctx.staff_initiated,
            ..Default::default()
        }
    }

    async fn enqueue(
        &self,
        appointment: &Appointment,
        kind: NotificationType,
        scheduled_at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> WillCallResult<NotificationJob> {
        self.scheduler
            .enqueue_job(&NewNotificationJob {
                appointment_id: appointment.id.clone(),
                kind,
                channel: NotificationChannel::Both,
                scheduled_at,
                payload,
            })
            .await
    }

    /// Reuse the active pickup token, issuing one atomically when none
    /// exists. Rotation revokes priors and inserts the replacement in one
    /// transaction.
    async fn ensure_link(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> WillCallResult<String> {
        let token = match self
            .token_repo
            .get_active(TokenKind::Appointment, &appointment.id, now)
            .await?
        {
            Some(active) => active.token,
            None => {
                let fresh = generate_token();
                let expires_at = appointment.end_at + Duration::days(TOKEN_TTL_DAYS);
                self.token_repo
                    .rotate(TokenKind::Appointment, &appointment.id, &fresh, expires_at)
                    .await?;
                fresh
            }
        };
        Ok(self.link_builder.build_link(&appointment.id, &token))
    }
}

/// The day-before reminder lands at the same local wall-clock time the
/// previous calendar day, so DST transitions never shift what the customer
/// reads; the hour-before reminder is a plain absolute offset.
fn reminder_slots(appointment: &Appointment) -> [(NotificationType, DateTime<Utc>); 2] {
    [
        (
            NotificationType::Reminder1Day,
            business_time::same_local_time_previous_day(appointment.start_at),
        ),
        (
            NotificationType::Reminder1Hour,
            appointment.start_at - Duration::hours(1),
        ),
    ]
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 24] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
