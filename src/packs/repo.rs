use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::packs::dto::AdminUpdatePackRequest;

/// Closed set of lifecycle states. Transitions are validated by the
/// operation queries below: each WHERE clause names the only allowed
/// source state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "pack_status", rename_all = "snake_case")]
pub enum PackStatus {
    Pending,
    CheckedOut,
    InTransit,
    Shipped,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pack {
    pub pack_id: i64,
    pub user_id: i64,
    pub pack_status: PackStatus,
    pub pickup_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub check_in_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub check_out_time: Option<OffsetDateTime>,
}

impl Pack {
    pub async fn find_by_pack_id(db: &PgPool, pack_id: i64) -> Result<Option<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            SELECT pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            FROM packs
            WHERE pack_id = $1
            "#,
        )
        .bind(pack_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_status(
        db: &PgPool,
        pack_id: i64,
        status: PackStatus,
    ) -> Result<Option<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            SELECT pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            FROM packs
            WHERE pack_id = $1 AND pack_status = $2
            "#,
        )
        .bind(pack_id)
        .bind(status)
        .fetch_optional(db)
        .await
    }

    /// Creates a pack row. The primary key on pack_id is the store-layer
    /// uniqueness constraint that serializes concurrent check-ins/mailings;
    /// callers map the unique violation to a conflict.
    pub async fn create(
        db: &PgPool,
        pack_id: i64,
        user_id: i64,
        status: PackStatus,
        pickup_code: &str,
    ) -> Result<Pack, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            INSERT INTO packs (pack_id, user_id, pack_status, pickup_code)
            VALUES ($1, $2, $3, $4)
            RETURNING pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            "#,
        )
        .bind(pack_id)
        .bind(user_id)
        .bind(status)
        .bind(pickup_code)
        .fetch_one(db)
        .await
    }

    /// pending → checked_out, stamping the check-out time. Returns None when
    /// no pending row matches pack and owner.
    pub async fn check_out(
        db: &PgPool,
        pack_id: i64,
        user_id: i64,
    ) -> Result<Option<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            UPDATE packs
            SET pack_status = 'checked_out', check_out_time = now()
            WHERE pack_id = $1 AND user_id = $2 AND pack_status = 'pending'
            RETURNING pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            "#,
        )
        .bind(pack_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// in_transit → cancelled. Returns None when no in-transit row matches
    /// pack and owner.
    pub async fn cancel_mail(
        db: &PgPool,
        pack_id: i64,
        user_id: i64,
    ) -> Result<Option<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            UPDATE packs
            SET pack_status = 'cancelled'
            WHERE pack_id = $1 AND user_id = $2 AND pack_status = 'in_transit'
            RETURNING pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            "#,
        )
        .bind(pack_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Unconditional status overwrite, located by pack id alone. Shipping
    /// also stamps the check-out time.
    pub async fn update_status(
        db: &PgPool,
        pack_id: i64,
        status: PackStatus,
    ) -> Result<Option<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            UPDATE packs
            SET pack_status = $2,
                check_out_time = CASE WHEN $2 = 'shipped'::pack_status THEN now() ELSE check_out_time END
            WHERE pack_id = $1
            RETURNING pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            "#,
        )
        .bind(pack_id)
        .bind(status)
        .fetch_optional(db)
        .await
    }

    /// Operator escape hatch: patches only the provided fields, bypassing
    /// every transition guard.
    pub async fn admin_update(
        db: &PgPool,
        patch: &AdminUpdatePackRequest,
    ) -> Result<Option<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            UPDATE packs
            SET user_id        = COALESCE($2, user_id),
                pack_status    = COALESCE($3, pack_status),
                pickup_code    = COALESCE($4, pickup_code),
                check_in_time  = COALESCE($5, check_in_time),
                check_out_time = COALESCE($6, check_out_time)
            WHERE pack_id = $1
            RETURNING pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            "#,
        )
        .bind(patch.pack_id)
        .bind(patch.user_id)
        .bind(patch.pack_status)
        .bind(patch.pickup_code.as_deref())
        .bind(patch.check_in_time)
        .bind(patch.check_out_time)
        .fetch_optional(db)
        .await
    }

    pub async fn list_by_user(db: &PgPool, user_id: i64) -> Result<Vec<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            SELECT pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            FROM packs
            WHERE user_id = $1
            ORDER BY check_in_time DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// All packs, optionally narrowed to one status (admin audit view).
    pub async fn list_all(
        db: &PgPool,
        status: Option<PackStatus>,
    ) -> Result<Vec<Pack>, sqlx::Error> {
        sqlx::query_as::<_, Pack>(
            r#"
            SELECT pack_id, user_id, pack_status, pickup_code, check_in_time, check_out_time
            FROM packs
            WHERE $1::pack_status IS NULL OR pack_status = $1
            ORDER BY check_in_time DESC
            "#,
        )
        .bind(status)
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PackStatus::CheckedOut).unwrap(),
            r#""checked_out""#
        );
        assert_eq!(
            serde_json::to_string(&PackStatus::InTransit).unwrap(),
            r#""in_transit""#
        );
        assert_eq!(
            serde_json::from_str::<PackStatus>(r#""cancelled""#).unwrap(),
            PackStatus::Cancelled
        );
    }

    #[test]
    fn status_rejects_unknown_strings() {
        assert!(serde_json::from_str::<PackStatus>(r#""lost""#).is_err());
        assert!(serde_json::from_str::<PackStatus>(r#""Pending""#).is_err());
    }

    #[test]
    fn pack_serializes_null_check_out_time_until_set() {
        let pack = Pack {
            pack_id: 100,
            user_id: 1,
            pack_status: PackStatus::Pending,
            pickup_code: "5-1978".into(),
            check_in_time: OffsetDateTime::UNIX_EPOCH,
            check_out_time: None,
        };
        let value = serde_json::to_value(&pack).unwrap();
        assert!(value["check_out_time"].is_null());
        assert_eq!(value["pack_status"], "pending");
        assert_eq!(value["pickup_code"], "5-1978");
    }
}
