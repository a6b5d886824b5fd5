use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    db,
    error::{is_unique_violation, ApiError},
    packs::{
        dto::{
            AdminUpdatePackRequest, CancelMailResponse, CheckInRequest, CheckOutRequest,
            MailRequest, PackListQuery, PackMessageResponse, PackResponse, PacksResponse,
            UpdateStatusRequest,
        },
        repo::{Pack, PackStatus},
    },
    state::AppState,
    users::repo::User,
};

pub fn pack_routes() -> Router<AppState> {
    Router::new()
        .route("/getPackDetails/:pack_id", get(get_pack_details))
        .route("/packCheckIn", post(check_in_pack))
        .route("/packCheckout", post(check_out_pack))
        .route("/mailPack", post(mail_pack))
        .route("/cancelMail", post(cancel_mail_pack))
        .route("/updatePackStatus", post(update_pack_status))
        .route("/allPacks/:user_id", get(get_all_packs_by_user))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/packs", get(get_all_packs))
        .route("/admin/pack", put(admin_update_pack))
}

/// Pickup code handed to the recipient: shelf code plus the trailing four
/// digits of the check-in instant. Practically distinct, not globally
/// unique.
fn derive_pickup_code(shelf_code: i64, now: OffsetDateTime) -> String {
    let suffix = (now.unix_timestamp_nanos() % 10_000).unsigned_abs();
    format!("{}-{:04}", shelf_code, suffix)
}

#[instrument(skip(state, _auth, payload))]
pub async fn check_in_pack(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<CheckInRequest>,
) -> Result<Json<PackMessageResponse>, ApiError> {
    let existing = db::bounded(Pack::find_by_status(
        &state.db,
        payload.pack_id,
        PackStatus::Pending,
    ))
    .await?;
    if existing.is_some() {
        warn!(pack_id = payload.pack_id, "pack already checked in");
        return Err(ApiError::Conflict("Pack already checked in"));
    }

    let pickup_code = derive_pickup_code(payload.shelf_code, OffsetDateTime::now_utc());

    let pack = match db::bounded(Pack::create(
        &state.db,
        payload.pack_id,
        payload.user_id,
        PackStatus::Pending,
        &pickup_code,
    ))
    .await
    {
        Ok(p) => p,
        // Lost the race against a concurrent check-in for the same pack id.
        Err(ApiError::Store(ref e)) if is_unique_violation(e) => {
            return Err(ApiError::Conflict("Pack already checked in"))
        }
        Err(e) => return Err(e),
    };

    info!(pack_id = pack.pack_id, user_id = pack.user_id, "pack checked in");
    Ok(Json(PackMessageResponse {
        message: "Pack checked in successfully",
        pack,
    }))
}

#[instrument(skip(state, _auth, payload))]
pub async fn check_out_pack(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<CheckOutRequest>,
) -> Result<Json<PackMessageResponse>, ApiError> {
    let pack = db::bounded(Pack::check_out(&state.db, payload.pack_id, payload.user_id))
        .await?
        .ok_or(ApiError::NotFound("No pending pack found for checkout"))?;

    info!(pack_id = pack.pack_id, user_id = pack.user_id, "pack checked out");
    Ok(Json(PackMessageResponse {
        message: "Pack checked out successfully",
        pack,
    }))
}

#[instrument(skip(state, _auth, payload))]
pub async fn mail_pack(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<MailRequest>,
) -> Result<Json<PackMessageResponse>, ApiError> {
    let recipient = db::bounded(User::find_by_phone(&state.db, &payload.recipient_phone))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let pack_id = state.ids.generate();

    let pack = match db::bounded(Pack::create(
        &state.db,
        pack_id,
        recipient.user_id,
        PackStatus::InTransit,
        "",
    ))
    .await
    {
        Ok(p) => p,
        Err(ApiError::Store(ref e)) if is_unique_violation(e) => {
            return Err(ApiError::Conflict("Pack already in transit"))
        }
        Err(e) => return Err(e),
    };

    info!(
        pack_id = pack.pack_id,
        recipient_id = recipient.user_id,
        "mail pack created"
    );
    Ok(Json(PackMessageResponse {
        message: "Mail pack created successfully",
        pack,
    }))
}

#[instrument(skip(state, _auth, payload))]
pub async fn cancel_mail_pack(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<CheckOutRequest>,
) -> Result<Json<CancelMailResponse>, ApiError> {
    let pack = db::bounded(Pack::cancel_mail(&state.db, payload.pack_id, payload.user_id))
        .await?
        .ok_or(ApiError::NotFound("pack not found"))?;

    info!(pack_id = pack.pack_id, "mail pack cancelled");
    Ok(Json(CancelMailResponse {
        cancelled_mail_pack: pack,
    }))
}

#[instrument(skip(state, _auth, payload))]
pub async fn update_pack_status(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<PackResponse>, ApiError> {
    let pack = db::bounded(Pack::update_status(
        &state.db,
        payload.pack_id,
        payload.pack_status,
    ))
    .await?
    .ok_or(ApiError::NotFound("pack not found"))?;

    info!(pack_id = pack.pack_id, status = ?pack.pack_status, "pack status updated");
    Ok(Json(PackResponse { pack }))
}

#[instrument(skip(state, _auth))]
pub async fn get_pack_details(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(pack_id): Path<i64>,
) -> Result<Json<PackResponse>, ApiError> {
    let pack = db::bounded(Pack::find_by_pack_id(&state.db, pack_id))
        .await?
        .ok_or(ApiError::NotFound("pack not found"))?;
    Ok(Json(PackResponse { pack }))
}

#[instrument(skip(state, _auth))]
pub async fn get_all_packs_by_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<PacksResponse>, ApiError> {
    let packs = db::bounded(Pack::list_by_user(&state.db, user_id)).await?;
    Ok(Json(PacksResponse { packs }))
}

#[instrument(skip(state, _admin))]
pub async fn get_all_packs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<PackListQuery>,
) -> Result<Json<PacksResponse>, ApiError> {
    let packs = db::bounded(Pack::list_all(&state.db, query.status)).await?;
    Ok(Json(PacksResponse { packs }))
}

#[instrument(skip(state, admin, payload))]
pub async fn admin_update_pack(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<AdminUpdatePackRequest>,
) -> Result<Json<PackResponse>, ApiError> {
    let pack = db::bounded(Pack::admin_update(&state.db, &payload))
        .await?
        .ok_or(ApiError::NotFound("Pack not found"))?;

    info!(
        pack_id = pack.pack_id,
        admin_id = admin.0.user_id,
        "pack patched by admin"
    );
    Ok(Json(PackResponse { pack }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn pickup_code_combines_shelf_and_time_digits() {
        let now = datetime!(2025-06-01 12:00:00.000001234 UTC);
        assert_eq!(derive_pickup_code(5, now), "5-1234");
    }

    #[test]
    fn pickup_code_pads_short_suffixes() {
        let now = datetime!(2025-06-01 12:00:00.000000007 UTC);
        assert_eq!(derive_pickup_code(12, now), "12-0007");
    }

    #[test]
    fn pickup_codes_differ_across_instants() {
        let a = derive_pickup_code(5, datetime!(2025-06-01 12:00:00.000001234 UTC));
        let b = derive_pickup_code(5, datetime!(2025-06-01 12:00:00.000005678 UTC));
        assert_ne!(a, b);
    }
}
