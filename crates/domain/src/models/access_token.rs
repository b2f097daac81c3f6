use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque customer-facing token. At most one active token per owning entity
/// is meaningful; rotation revokes priors and issues the replacement in a
/// single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: i64,
    pub kind: TokenKind,
    /// Appointment id or order number, depending on `kind`.
    pub owner_id: String,
    pub token: String,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[serde(rename = "APPOINTMENT")]
    Appointment,
    #[serde(rename = "ORDER_READY")]
    OrderReady,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Appointment => "APPOINTMENT",
            TokenKind::OrderReady => "ORDER_READY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPOINTMENT" => Some(TokenKind::Appointment),
            "ORDER_READY" => Some(TokenKind::OrderReady),
            _ => None,
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for TokenKind {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TokenKind {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        TokenKind::parse(s).ok_or_else(|| format!("invalid token kind: {s}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TokenKind {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn active_requires_not_revoked_and_not_expired() {
        let now = Utc::now();
        let mut token = AccessToken {
            id: 1,
            kind: TokenKind::Appointment,
            owner_id: "appt-1".into(),
            token: "abc".into(),
            revoked_at: None,
            expires_at: now + Duration::days(7),
            created_at: now,
        };
        assert!(token.is_active(now));

        token.revoked_at = Some(now);
        assert!(!token.is_active(now));

        token.revoked_at = None;
        token.expires_at = now - Duration::seconds(1);
        assert!(!token.is_active(now));
    }
}
