use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub student_id: String,
    pub phone: String,
    pub address: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub register_time: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, user_name, password_hash, student_id, phone, address, role, register_time
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_student_id(
        db: &PgPool,
        student_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, user_name, password_hash, student_id, phone, address, role, register_time
            FROM users
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_phone(db: &PgPool, phone: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, user_name, password_hash, student_id, phone, address, role, register_time
            FROM users
            WHERE phone = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(db)
        .await
    }

    /// Duplicate probe used by registration: student id and phone are each
    /// globally unique.
    pub async fn find_by_student_or_phone(
        db: &PgPool,
        student_id: &str,
        phone: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, user_name, password_hash, student_id, phone, address, role, register_time
            FROM users
            WHERE student_id = $1 OR phone = $2
            "#,
        )
        .bind(student_id)
        .bind(phone)
        .fetch_optional(db)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        user_name: &str,
        password_hash: &str,
        student_id: &str,
        phone: &str,
        address: &str,
        role: Role,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, user_name, password_hash, student_id, phone, address, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING user_id, user_name, password_hash, student_id, phone, address, role, register_time
            "#,
        )
        .bind(user_id)
        .bind(user_name)
        .bind(password_hash)
        .bind(student_id)
        .bind(phone)
        .bind(address)
        .bind(role)
        .fetch_one(db)
        .await
    }

    /// Partial profile patch: only provided fields are touched.
    pub async fn update_profile(
        db: &PgPool,
        user_id: i64,
        user_name: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET user_name = COALESCE($2, user_name),
                phone     = COALESCE($3, phone),
                address   = COALESCE($4, address)
            WHERE user_id = $1
            RETURNING user_id, user_name, password_hash, student_id, phone, address, role, register_time
            "#,
        )
        .bind(user_id)
        .bind(user_name)
        .bind(phone)
        .bind(address)
        .fetch_optional(db)
        .await
    }

    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, user_name, password_hash, student_id, phone, address, role, register_time
            FROM users
            ORDER BY register_time DESC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn delete(db: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let done = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        assert_eq!(
            serde_json::from_str::<Role>(r#""admin""#).unwrap(),
            Role::Admin
        );
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            user_id: 1,
            user_name: "Kei".into(),
            password_hash: "$argon2id$secret".into(),
            student_id: "S-1".into(),
            phone: "13800000000".into(),
            address: "".into(),
            role: Role::User,
            register_time: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains(r#""student_id":"S-1""#));
    }
}
