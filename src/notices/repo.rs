use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Announcement record, peripheral to the locker flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notice {
    pub notice_id: i64,
    pub company_id: i32,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub send_time: OffsetDateTime,
}

impl Notice {
    pub async fn list_all(db: &PgPool) -> Result<Vec<Notice>, sqlx::Error> {
        sqlx::query_as::<_, Notice>(
            r#"
            SELECT notice_id, company_id, title, content, send_time
            FROM notices
            ORDER BY send_time DESC
            "#,
        )
        .fetch_all(db)
        .await
    }
}
