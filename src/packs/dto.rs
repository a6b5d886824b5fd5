use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::packs::repo::{Pack, PackStatus};

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub pack_id: i64,
    pub user_id: i64,
    pub shelf_code: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub pack_id: i64,
    pub user_id: i64,
}

/// Mail creation input. Addresses and names travel with the parcel; only
/// the recipient phone is resolved against the user directory.
#[derive(Debug, Deserialize)]
pub struct MailRequest {
    pub shipping_address: String,
    pub recipient: String,
    pub reciving_address: String,
    pub shipper_phone: String,
    pub recipient_phone: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub pack_id: i64,
    pub pack_status: PackStatus,
}

/// Admin patch: only provided fields are touched.
#[derive(Debug, Deserialize)]
pub struct AdminUpdatePackRequest {
    pub pack_id: i64,
    pub user_id: Option<i64>,
    pub pack_status: Option<PackStatus>,
    pub pickup_code: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub check_in_time: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub check_out_time: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct PackListQuery {
    pub status: Option<PackStatus>,
}

#[derive(Debug, Serialize)]
pub struct PackResponse {
    pub pack: Pack,
}

#[derive(Debug, Serialize)]
pub struct PacksResponse {
    pub packs: Vec<Pack>,
}

#[derive(Debug, Serialize)]
pub struct PackMessageResponse {
    pub message: &'static str,
    pub pack: Pack,
}

#[derive(Debug, Serialize)]
pub struct CancelMailResponse {
    pub cancelled_mail_pack: Pack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_patch_fields_default_to_absent() {
        let patch: AdminUpdatePackRequest =
            serde_json::from_value(serde_json::json!({ "pack_id": 100 })).expect("deserialize");
        assert_eq!(patch.pack_id, 100);
        assert!(patch.user_id.is_none());
        assert!(patch.pack_status.is_none());
        assert!(patch.pickup_code.is_none());
        assert!(patch.check_in_time.is_none());
        assert!(patch.check_out_time.is_none());
    }

    #[test]
    fn admin_patch_parses_rfc3339_timestamps() {
        let patch: AdminUpdatePackRequest = serde_json::from_value(serde_json::json!({
            "pack_id": 100,
            "pack_status": "shipped",
            "check_out_time": "2025-06-01T12:00:00Z"
        }))
        .expect("deserialize");
        assert_eq!(patch.pack_status, Some(PackStatus::Shipped));
        let out = patch.check_out_time.expect("timestamp");
        assert_eq!(out.unix_timestamp(), 1_748_779_200);
    }

    #[test]
    fn list_query_status_is_optional() {
        let q: PackListQuery = serde_json::from_value(serde_json::json!({})).expect("deserialize");
        assert!(q.status.is_none());
        let q: PackListQuery = serde_json::from_value(serde_json::json!({"status": "cancelled"}))
            .expect("deserialize");
        assert_eq!(q.status, Some(PackStatus::Cancelled));
    }
}
