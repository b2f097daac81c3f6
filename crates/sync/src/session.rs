//! Explicit ERP session state.
//!
//! The session is a plain value passed to whichever call needs it, with
//! explicit refresh, so there is no hidden module-level token shared across
//! concurrent callers in a multi-instance deployment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use willcall_core::WillCallResult;

#[derive(Debug, Clone)]
pub struct ErpSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ErpSession {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && self.expires_at > now
    }

    /// Return a session valid at `now`, refreshing through `refresher` only
    /// when the current one has expired.
    pub async fn ensure_valid(
        self,
        refresher: &dyn SessionRefresher,
        now: DateTime<Utc>,
    ) -> WillCallResult<ErpSession> {
        if self.is_valid(now) {
            Ok(self)
        } else {
            refresher.refresh().await
        }
    }
}

/// Authenticates against the ERP and yields a fresh session. The transport
/// lives outside this crate.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self) -> WillCallResult<ErpSession>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct FixedRefresher(ErpSession);

    #[async_trait]
    impl SessionRefresher for FixedRefresher {
        async fn refresh(&self) -> WillCallResult<ErpSession> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn valid_session_is_not_refreshed() {
        let now = Utc::now();
        let session = ErpSession::new("tok-a", now + Duration::hours(1));
        let refresher = FixedRefresher(ErpSession::new("tok-b", now + Duration::hours(2)));

        let result = session.ensure_valid(&refresher, now).await.unwrap();
        assert_eq!(result.token, "tok-a");
    }

    #[tokio::test]
    async fn expired_session_refreshes() {
        let now = Utc::now();
        let session = ErpSession::new("tok-a", now - Duration::seconds(1));
        let refresher = FixedRefresher(ErpSession::new("tok-b", now + Duration::hours(2)));

        let result = session.ensure_valid(&refresher, now).await.unwrap();
        assert_eq!(result.token, "tok-b");
    }

    #[test]
    fn empty_token_is_invalid() {
        let session = ErpSession::new("", Utc::now() + Duration::hours(1));
        assert!(!session.is_valid(Utc::now()));
    }
}
