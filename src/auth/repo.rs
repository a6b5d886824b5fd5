use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// A persisted token pair. The row's presence is the source of truth for
/// "currently valid"; deleting it revokes the pair regardless of the
/// signature-embedded expiry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserToken {
    pub token_id: i64,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl UserToken {
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        access_token: &str,
        refresh_token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<UserToken, sqlx::Error> {
        sqlx::query_as::<_, UserToken>(
            r#"
            INSERT INTO user_tokens (user_id, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING token_id, user_id, access_token, refresh_token, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_access(
        db: &PgPool,
        access_token: &str,
    ) -> Result<Option<UserToken>, sqlx::Error> {
        sqlx::query_as::<_, UserToken>(
            r#"
            SELECT token_id, user_id, access_token, refresh_token, created_at, expires_at
            FROM user_tokens
            WHERE access_token = $1
            "#,
        )
        .bind(access_token)
        .fetch_optional(db)
        .await
    }

    /// Revokes the pair holding this access token. Returns how many rows
    /// were removed.
    pub async fn delete_by_access(db: &PgPool, access_token: &str) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM user_tokens WHERE access_token = $1")
            .bind(access_token)
            .execute(db)
            .await?;
        Ok(done.rows_affected())
    }

    /// Revokes every token a user holds.
    pub async fn delete_by_user(db: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(done.rows_affected())
    }
}
