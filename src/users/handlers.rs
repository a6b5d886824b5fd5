use axum::{
    extract::{Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::MessageResponse,
        extractors::{AdminUser, AuthUser},
        handlers::is_valid_phone,
        repo::UserToken,
    },
    db,
    error::{is_unique_violation, ApiError},
    state::AppState,
    users::{
        dto::{DeleteUserParams, UpdateUserRequest, UpdateUserResponse, UsersResponse},
        repo::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/updateUserInfo", post(update_user_info))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(get_all_users))
        .route("/admin/deleteUser", delete(delete_user))
}

#[instrument(skip(state, _auth, payload))]
pub async fn update_user_info(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, ApiError> {
    if let Some(phone) = payload.phone.as_deref() {
        if !is_valid_phone(phone) {
            warn!(phone = %phone, "invalid phone number");
            return Err(ApiError::Validation("Invalid phone number".into()));
        }
    }

    let updated = match db::bounded(User::update_profile(
        &state.db,
        payload.user_id,
        payload.user_name.as_deref(),
        payload.phone.as_deref(),
        payload.address.as_deref(),
    ))
    .await
    {
        Ok(row) => row,
        Err(ApiError::Store(ref e)) if is_unique_violation(e) => {
            return Err(ApiError::Conflict("Phone already in use"))
        }
        Err(e) => return Err(e),
    };

    let user = updated.ok_or(ApiError::NotFound("user not found"))?;
    info!(user_id = user.user_id, "user profile updated");
    Ok(Json(UpdateUserResponse { update_user: user }))
}

#[instrument(skip(state, _admin))]
pub async fn get_all_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = db::bounded(User::list_all(&state.db)).await?;
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(params): Query<DeleteUserParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = db::bounded(User::find_by_id(&state.db, params.user_id))
        .await?
        .ok_or(ApiError::NotFound("user not found"))?;

    // A deleted user must not keep live sessions: drop the token rows first
    // so the guard's liveness check rejects anything already issued.
    let revoked = db::bounded(UserToken::delete_by_user(&state.db, user.user_id)).await?;
    db::bounded(User::delete(&state.db, user.user_id)).await?;

    info!(
        user_id = user.user_id,
        revoked,
        admin_id = admin.0.user_id,
        "user deleted"
    );
    Ok(Json(MessageResponse {
        message: "delete user complete",
    }))
}
