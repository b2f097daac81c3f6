//! Boundary contracts for external collaborators. Transport details (Twilio,
//! Graph email, the ERP HTTP client) live behind these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use willcall_core::WillCallResult;

/// Result of a channel send. `skipped` means the sender chose not to deliver
/// (for example, a non-production environment with no test destination
/// configured) without that being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub ok: bool,
    pub skipped: bool,
}

impl SendOutcome {
    pub fn sent() -> Self {
        Self {
            ok: true,
            skipped: false,
        }
    }

    pub fn skipped() -> Self {
        Self {
            ok: true,
            skipped: true,
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> WillCallResult<SendOutcome>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> WillCallResult<SendOutcome>;
}

/// Source of raw ERP order rows for one customer account. Rows are
/// loosely-typed JSON and may use `{"value": ...}` wrapper fields.
#[async_trait]
pub trait ErpRowSource: Send + Sync {
    async fn fetch_orders(
        &self,
        account: &str,
        since: DateTime<Utc>,
    ) -> WillCallResult<Vec<serde_json::Value>>;
}

/// Builds the customer-facing pickup link embedded in notifications. Token
/// validity is the token subsystem's concern; the link is not re-validated
/// at send time.
pub trait LinkBuilder: Send + Sync {
    fn build_link(&self, appointment_id: &str, token: &str) -> String;
}

/// Plain base-URL link builder used by the embedded deployment.
pub struct BaseUrlLinkBuilder {
    base_url: String,
}

impl BaseUrlLinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl LinkBuilder for BaseUrlLinkBuilder {
    fn build_link(&self, appointment_id: &str, token: &str) -> String {
        format!(
            "{}/{}?token={}",
            self.base_url.trim_end_matches('/'),
            appointment_id,
            token
        )
    }
}
