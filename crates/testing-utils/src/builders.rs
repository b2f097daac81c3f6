//! Builders for test entities with sensible defaults and fluent overrides.

use chrono::{DateTime, Duration, Utc};
use willcall_domain::{
    Appointment, AppointmentStatus, JobStatus, NotificationChannel, NotificationJob,
    NotificationPayload, NotificationType, OrderRecord,
};

pub struct AppointmentBuilder {
    appointment: Appointment,
}

impl AppointmentBuilder {
    pub fn new(id: &str) -> Self {
        let start = Utc::now() + Duration::days(2);
        let mut appointment = Appointment::new(id.to_string(), start, start + Duration::hours(1));
        appointment.customer_email = Some("customer@example.com".to_string());
        appointment.customer_phone = Some("+13035550100".to_string());
        appointment.email_opt_in = true;
        appointment.sms_opt_in = true;
        appointment.order_nbrs = vec!["SO-1001".to_string()];
        Self { appointment }
    }

    pub fn starting_at(mut self, start_at: DateTime<Utc>) -> Self {
        let duration = self.appointment.end_at - self.appointment.start_at;
        self.appointment.start_at = start_at;
        self.appointment.end_at = start_at + duration;
        self
    }

    pub fn ending_at(mut self, end_at: DateTime<Utc>) -> Self {
        self.appointment.end_at = end_at;
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.appointment.status = status;
        self
    }

    pub fn with_orders(mut self, order_nbrs: &[&str]) -> Self {
        self.appointment.order_nbrs = order_nbrs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn email_only(mut self) -> Self {
        self.appointment.sms_opt_in = false;
        self
    }

    pub fn sms_only(mut self) -> Self {
        self.appointment.email_opt_in = false;
        self
    }

    pub fn opted_out(mut self) -> Self {
        self.appointment.email_opt_in = false;
        self.appointment.sms_opt_in = false;
        self.appointment.opted_out_at = Some(Utc::now());
        self
    }

    pub fn with_email_override(mut self, email: &str) -> Self {
        self.appointment.email_override = Some(email.to_string());
        self
    }

    pub fn with_phone_override(mut self, phone: &str) -> Self {
        self.appointment.phone_override = Some(phone.to_string());
        self
    }

    pub fn build(self) -> Appointment {
        self.appointment
    }
}

pub struct NotificationJobBuilder {
    job: NotificationJob,
}

impl NotificationJobBuilder {
    pub fn new(id: i64, appointment_id: &str) -> Self {
        let scheduled_at = Utc::now();
        let kind = NotificationType::ScheduledConfirm;
        Self {
            job: NotificationJob {
                id,
                appointment_id: appointment_id.to_string(),
                kind,
                channel: NotificationChannel::Both,
                scheduled_at,
                status: JobStatus::Pending,
                idempotency_key: NotificationJob::idempotency_key(
                    appointment_id,
                    kind,
                    scheduled_at,
                ),
                payload: NotificationPayload {
                    link: Some("https://pickup.example.com/appointments/test?token=t".to_string()),
                    ..Default::default()
                },
                attempt_count: 0,
                last_attempt_at: None,
                sent_at: None,
                created_at: scheduled_at,
            },
        }
    }

    pub fn with_kind(mut self, kind: NotificationType) -> Self {
        self.job.kind = kind;
        self.rekey()
    }

    pub fn with_channel(mut self, channel: NotificationChannel) -> Self {
        self.job.channel = channel;
        self
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.job.scheduled_at = at;
        self.rekey()
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn with_payload(mut self, payload: NotificationPayload) -> Self {
        self.job.payload = payload;
        self
    }

    pub fn without_link(mut self) -> Self {
        self.job.payload.link = None;
        self
    }

    pub fn ignoring_cap(mut self) -> Self {
        self.job.payload.ignore_cap = true;
        self
    }

    fn rekey(mut self) -> Self {
        self.job.idempotency_key = NotificationJob::idempotency_key(
            &self.job.appointment_id,
            self.job.kind,
            self.job.scheduled_at,
        );
        self
    }

    pub fn build(self) -> NotificationJob {
        self.job
    }
}

pub struct OrderRecordBuilder {
    order: OrderRecord,
}

impl OrderRecordBuilder {
    pub fn new(order_nbr: &str) -> Self {
        Self {
            order: OrderRecord {
                order_nbr: order_nbr.to_string(),
                status: "Open".to_string(),
                location_id: Some("MAIN".to_string()),
                requested_on: Utc::now() - Duration::days(3),
                ship_via: Some("WILLCALL".to_string()),
                job_name: None,
                customer_name: Some("Acme Builders".to_string()),
                buyer_group: None,
                note_id: None,
            },
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.order.status = status.to_string();
        self
    }

    pub fn requested_on(mut self, at: DateTime<Utc>) -> Self {
        self.order.requested_on = at;
        self
    }

    pub fn build(self) -> OrderRecord {
        self.order
    }
}
