use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled outbound message. The idempotency key makes enqueue an
/// upsert-on-conflict no-op: the same (appointment, type, scheduled time)
/// persists exactly one row no matter how often it is enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: i64,
    pub appointment_id: String,
    pub kind: NotificationType,
    pub channel: NotificationChannel,
    pub scheduled_at: DateTime<Utc>,
    pub status: JobStatus,
    pub idempotency_key: String,
    pub payload: NotificationPayload,
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn idempotency_key(
        appointment_id: &str,
        kind: NotificationType,
        scheduled_at: DateTime<Utc>,
    ) -> String {
        format!(
            "{}|{}|{}",
            appointment_id,
            kind.as_str(),
            scheduled_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Enqueue request; the repository assigns id, status and idempotency key.
#[derive(Debug, Clone)]
pub struct NewNotificationJob {
    pub appointment_id: String,
    pub kind: NotificationType,
    pub channel: NotificationChannel,
    pub scheduled_at: DateTime<Utc>,
    pub payload: NotificationPayload,
}

/// Frozen copy of everything the message needs at send time. Fields left
/// empty fall back to live appointment/order data in the runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub order_nbrs: Vec<String>,
    pub old_start_at: Option<DateTime<Utc>>,
    pub old_end_at: Option<DateTime<Utc>>,
    pub new_start_at: Option<DateTime<Utc>>,
    pub new_end_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub ignore_cap: bool,
    #[serde(default)]
    pub staff_initiated: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NotificationType {
    #[serde(rename = "SCHEDULED_CONFIRM")]
    ScheduledConfirm,
    #[serde(rename = "REMINDER_1_DAY")]
    Reminder1Day,
    #[serde(rename = "REMINDER_1_HOUR")]
    Reminder1Hour,
    #[serde(rename = "RESCHEDULED")]
    Rescheduled,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "ORDER_LIST_CHANGED")]
    OrderListChanged,
    #[serde(rename = "READY_FOR_PICKUP")]
    ReadyForPickup,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ScheduledConfirm => "SCHEDULED_CONFIRM",
            NotificationType::Reminder1Day => "REMINDER_1_DAY",
            NotificationType::Reminder1Hour => "REMINDER_1_HOUR",
            NotificationType::Rescheduled => "RESCHEDULED",
            NotificationType::Cancelled => "CANCELLED",
            NotificationType::Completed => "COMPLETED",
            NotificationType::OrderListChanged => "ORDER_LIST_CHANGED",
            NotificationType::ReadyForPickup => "READY_FOR_PICKUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED_CONFIRM" => Some(NotificationType::ScheduledConfirm),
            "REMINDER_1_DAY" => Some(NotificationType::Reminder1Day),
            "REMINDER_1_HOUR" => Some(NotificationType::Reminder1Hour),
            "RESCHEDULED" => Some(NotificationType::Rescheduled),
            "CANCELLED" => Some(NotificationType::Cancelled),
            "COMPLETED" => Some(NotificationType::Completed),
            "ORDER_LIST_CHANGED" => Some(NotificationType::OrderListChanged),
            "READY_FOR_PICKUP" => Some(NotificationType::ReadyForPickup),
            _ => None,
        }
    }

    /// Reminders are the only job types made stale by a terminal appointment.
    pub fn is_reminder(&self) -> bool {
        matches!(
            self,
            NotificationType::Reminder1Day | NotificationType::Reminder1Hour
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NotificationChannel {
    #[serde(rename = "SMS")]
    Sms,
    #[serde(rename = "EMAIL")]
    Email,
    #[serde(rename = "BOTH")]
    Both,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Sms => "SMS",
            NotificationChannel::Email => "EMAIL",
            NotificationChannel::Both => "BOTH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SMS" => Some(NotificationChannel::Sms),
            "EMAIL" => Some(NotificationChannel::Email),
            "BOTH" => Some(NotificationChannel::Both),
            _ => None,
        }
    }

    pub fn includes_sms(&self) -> bool {
        matches!(self, NotificationChannel::Sms | NotificationChannel::Both)
    }

    pub fn includes_email(&self) -> bool {
        matches!(self, NotificationChannel::Email | NotificationChannel::Both)
    }
}

/// `Pending -> {Sent, Skipped, Cancelled, Failed}`; all four are terminal.
/// A Failed job is not re-queued automatically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "SENT")]
    Sent,
    #[serde(rename = "SKIPPED")]
    Skipped,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "FAILED")]
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Sent => "SENT",
            JobStatus::Skipped => "SKIPPED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "SENT" => Some(JobStatus::Sent),
            "SKIPPED" => Some(JobStatus::Skipped),
            "CANCELLED" => Some(JobStatus::Cancelled),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

macro_rules! sqlite_str_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <str as sqlx::Type<sqlx::Sqlite>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                <$ty>::parse(s).ok_or_else(|| {
                    format!(concat!("invalid ", stringify!($ty), ": {}"), s).into()
                })
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
            }
        }
    };
}

sqlite_str_enum!(NotificationType);
sqlite_str_enum!(NotificationChannel);
sqlite_str_enum!(JobStatus);
