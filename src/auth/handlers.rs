use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest},
        extractors::{bearer_token, AuthUser},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserToken,
    },
    db,
    error::{is_unique_violation, ApiError},
    state::AppState,
    users::repo::{Role, User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{5,20}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

/// Signs an (access, refresh) pair and persists the token row; a token is
/// only live while that row exists.
async fn issue_tokens(state: &AppState, user: &User) -> Result<(String, String), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let (access, refresh) = keys.sign_pair(user)?;
    let expires_at = OffsetDateTime::now_utc() + TimeDuration::seconds(keys.ttl.as_secs() as i64);
    db::bounded(UserToken::create(
        &state.db,
        user.user_id,
        &access,
        &refresh,
        expires_at,
    ))
    .await?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.user_name.trim().is_empty()
        || payload.password.is_empty()
        || payload.student_id.trim().is_empty()
    {
        return Err(ApiError::Validation("Invalid input".into()));
    }
    if !is_valid_phone(&payload.phone) {
        warn!(phone = %payload.phone, "invalid phone number");
        return Err(ApiError::Validation("Invalid phone number".into()));
    }

    let role = payload.role.unwrap_or(Role::User);

    let existing = db::bounded(User::find_by_student_or_phone(
        &state.db,
        &payload.student_id,
        &payload.phone,
    ))
    .await?;
    if existing.is_some() {
        warn!(student_id = %payload.student_id, "duplicate registration");
        return Err(ApiError::Conflict("User already exists"));
    }

    let user_id = state.ids.generate();
    let hash = hash_password(&payload.password)?;

    let user = match db::bounded(User::create(
        &state.db,
        user_id,
        &payload.user_name,
        &hash,
        &payload.student_id,
        &payload.phone,
        &payload.address,
        role,
    ))
    .await
    {
        Ok(u) => u,
        // Lost the race against a concurrent registration.
        Err(ApiError::Store(ref e)) if is_unique_violation(e) => {
            return Err(ApiError::Conflict("User already exists"))
        }
        Err(e) => return Err(e),
    };

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    info!(user_id = user.user_id, student_id = %user.student_id, "user registered");
    Ok(Json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = db::bounded(User::find_by_student_id(&state.db, &payload.student_id)).await?;

    // Unknown user and wrong password must be indistinguishable.
    let Some(user) = user else {
        warn!(student_id = %payload.student_id, "login unknown student id");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash) {
        warn!(user_id = user.user_id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    info!(user_id = user.user_id, student_id = %user.student_id, "user logged in");
    Ok(Json(AuthResponse {
        user,
        access_token,
        refresh_token,
    }))
}

#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = bearer_token(&headers)?;
    let removed = db::bounded(UserToken::delete_by_access(&state.db, token)).await?;
    info!(user_id = identity.user_id, removed, "user logged out");
    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_international_phones() {
        assert!(is_valid_phone("13800000000"));
        assert!(is_valid_phone("+4915112345678"));
    }

    #[test]
    fn rejects_malformed_phones() {
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("123"));
        assert!(!is_valid_phone("phone-number"));
        assert!(!is_valid_phone("138 0000 0000"));
    }

    #[test]
    fn register_role_defaults_to_user() {
        let payload: RegisterRequest = serde_json::from_value(serde_json::json!({
            "user_name": "Kei",
            "password": "secret",
            "student_id": "S-1",
            "phone": "13800000000"
        }))
        .expect("deserialize");
        assert_eq!(payload.role, None);
        assert_eq!(payload.role.unwrap_or(Role::User), Role::User);
        assert_eq!(payload.address, "");
    }

    #[test]
    fn register_rejects_unknown_role_strings() {
        let result = serde_json::from_value::<RegisterRequest>(serde_json::json!({
            "user_name": "Kei",
            "password": "secret",
            "student_id": "S-1",
            "phone": "13800000000",
            "role": "superuser"
        }));
        assert!(result.is_err());
    }
}
