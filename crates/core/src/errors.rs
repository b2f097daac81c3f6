use thiserror::Error;

#[derive(Debug, Error)]
pub enum WillCallError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database operation error: {0}")]
    DatabaseOperation(String),
    #[error("appointment not found: {id}")]
    AppointmentNotFound { id: String },
    #[error("notification job not found: {id}")]
    JobNotFound { id: i64 },
    #[error("order not found: {order_nbr}")]
    OrderNotFound { order_nbr: String },
    #[error("job {job_id} payload is missing a pickup link")]
    MissingLink { job_id: i64 },
    #[error("channel send failed: {0}")]
    ChannelSend(String),
    #[error("ERP fetch failed: {0}")]
    ErpFetch(String),
    #[error("ERP session expired for account {account}")]
    SessionExpired { account: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type WillCallResult<T> = Result<T, WillCallError>;

impl WillCallError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn appointment_not_found<S: Into<String>>(id: S) -> Self {
        Self::AppointmentNotFound { id: id.into() }
    }
    pub fn job_not_found(id: i64) -> Self {
        Self::JobNotFound { id }
    }
    pub fn channel_send<S: Into<String>>(msg: S) -> Self {
        Self::ChannelSend(msg.into())
    }
    pub fn erp_fetch<S: Into<String>>(msg: S) -> Self {
        Self::ErpFetch(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    /// Fatal errors abort collaborator construction; everything else is
    /// handled per item by the owning loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WillCallError::Configuration(_) | WillCallError::Internal(_)
        )
    }
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WillCallError::DatabaseOperation(_)
                | WillCallError::ChannelSend(_)
                | WillCallError::ErpFetch(_)
        )
    }
}

impl From<serde_json::Error> for WillCallError {
    fn from(err: serde_json::Error) -> Self {
        WillCallError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for WillCallError {
    fn from(err: anyhow::Error) -> Self {
        WillCallError::Internal(err.to_string())
    }
}
