use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use willcall_core::WillCallResult;
use willcall_domain::{AccessToken, AccessTokenRepository, TokenKind};

pub struct SqliteAccessTokenRepository {
    pool: SqlitePool,
}

impl SqliteAccessTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_token(row: &sqlx::sqlite::SqliteRow) -> WillCallResult<AccessToken> {
        Ok(AccessToken {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            owner_id: row.try_get("owner_id")?,
            token: row.try_get("token")?,
            revoked_at: row.try_get("revoked_at")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AccessTokenRepository for SqliteAccessTokenRepository {
    async fn rotate(
        &self,
        kind: TokenKind,
        owner_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> WillCallResult<AccessToken> {
        let now = Utc::now();
        // Revoke-and-insert in one transaction, so a crash between the two
        // statements cannot leave the owner with no token at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE access_tokens SET revoked_at = ?3
             WHERE kind = ?1 AND owner_id = ?2 AND revoked_at IS NULL",
        )
        .bind(kind)
        .bind(owner_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO access_tokens (kind, owner_id, token, revoked_at, expires_at, created_at)
            VALUES (?1, ?2, ?3, NULL, ?4, ?5)
            "#,
        )
        .bind(kind)
        .bind(owner_id)
        .bind(token)
        .bind(expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AccessToken {
            id: result.last_insert_rowid(),
            kind,
            owner_id: owner_id.to_string(),
            token: token.to_string(),
            revoked_at: None,
            expires_at,
            created_at: now,
        })
    }

    async fn get_active(
        &self,
        kind: TokenKind,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> WillCallResult<Option<AccessToken>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM access_tokens
            WHERE kind = ?1 AND owner_id = ?2 AND revoked_at IS NULL AND expires_at > ?3
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(kind)
        .bind(owner_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_token).transpose()
    }
}
