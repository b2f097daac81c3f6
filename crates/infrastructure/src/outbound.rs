//! Embedded-mode outbound adapters.
//!
//! Real SMS/email transports live outside this repository; the embedded
//! deployment logs deliveries and reads ERP rows from a file drop. Swap
//! these for transport-backed implementations behind the same ports.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use willcall_core::{WillCallError, WillCallResult};
use willcall_domain::{EmailSender, ErpRowSource, SendOutcome, SmsSender};

/// Logs the delivery instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _html_body: &str,
    ) -> WillCallResult<SendOutcome> {
        info!(to = %to, subject = %subject, "email delivery (logging transport)");
        Ok(SendOutcome::sent())
    }
}

/// Logs the delivery instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LoggingSmsSender;

#[async_trait]
impl SmsSender for LoggingSmsSender {
    async fn send_sms(&self, to: &str, body: &str) -> WillCallResult<SendOutcome> {
        info!(to = %to, body_len = body.len(), "sms delivery (logging transport)");
        Ok(SendOutcome::sent())
    }
}

/// Reads raw ERP order rows from a JSON array file dropped by the export
/// job. A missing file is an empty batch, not an error; a malformed file is.
#[derive(Debug, Clone)]
pub struct FileDropRowSource {
    path: PathBuf,
}

impl FileDropRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ErpRowSource for FileDropRowSource {
    async fn fetch_orders(
        &self,
        account: &str,
        since: DateTime<Utc>,
    ) -> WillCallResult<Vec<serde_json::Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "no ERP drop file; empty batch");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(WillCallError::erp_fetch(format!(
                    "reading {}: {e}",
                    self.path.display()
                )))
            }
        };

        let rows: Vec<serde_json::Value> = serde_json::from_slice(&bytes).map_err(|e| {
            WillCallError::erp_fetch(format!("parsing {}: {e}", self.path.display()))
        })?;
        info!(
            account = %account,
            since = %since,
            rows = rows.len(),
            "ERP drop file loaded"
        );
        Ok(rows)
    }
}
