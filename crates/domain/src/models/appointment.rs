use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location_id: Option<String>,
    pub status: AppointmentStatus,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub email_opt_in: bool,
    pub sms_opt_in: bool,
    /// Per-channel overrides take precedence over the customer contact fields.
    pub email_override: Option<String>,
    pub phone_override: Option<String>,
    pub opted_out_at: Option<DateTime<Utc>>,
    pub opt_out_reason: Option<String>,
    /// Order numbers belonging to this pickup, in display order.
    pub order_nbrs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(id: String, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id,
            start_at,
            end_at,
            location_id: None,
            status: AppointmentStatus::Scheduled,
            customer_email: None,
            customer_phone: None,
            email_opt_in: false,
            sms_opt_in: false,
            email_override: None,
            phone_override: None,
            opted_out_at: None,
            opt_out_reason: None,
            order_nbrs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn email_destination(&self) -> Option<&str> {
        self.email_override
            .as_deref()
            .or(self.customer_email.as_deref())
    }

    pub fn phone_destination(&self) -> Option<&str> {
        self.phone_override
            .as_deref()
            .or(self.customer_phone.as_deref())
    }

    /// Email is deliverable: opted in and a destination resolves.
    pub fn wants_email(&self) -> bool {
        self.email_opt_in && self.email_destination().is_some()
    }

    /// SMS is deliverable: opted in and a destination resolves.
    pub fn wants_sms(&self) -> bool {
        self.sms_opt_in && self.phone_destination().is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    #[serde(rename = "SCHEDULED")]
    Scheduled,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "NO_SHOW")]
    NoShow,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::InProgress => "IN_PROGRESS",
            AppointmentStatus::Ready => "READY",
            AppointmentStatus::NoShow => "NO_SHOW",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(AppointmentStatus::Scheduled),
            "CONFIRMED" => Some(AppointmentStatus::Confirmed),
            "IN_PROGRESS" => Some(AppointmentStatus::InProgress),
            "READY" => Some(AppointmentStatus::Ready),
            "NO_SHOW" => Some(AppointmentStatus::NoShow),
            "COMPLETED" => Some(AppointmentStatus::Completed),
            "CANCELLED" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// NoShow, Completed and Cancelled end the lifecycle; reminders for an
    /// appointment in one of these states are stale.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::NoShow | AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl sqlx::Type<sqlx::Sqlite> for AppointmentStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for AppointmentStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        AppointmentStatus::parse(s).ok_or_else(|| format!("invalid appointment status: {s}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for AppointmentStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}
