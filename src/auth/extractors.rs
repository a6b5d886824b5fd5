use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use tracing::warn;

use crate::auth::jwt::{JwtKeys, TokenError, TokenKind};
use crate::auth::repo::UserToken;
use crate::db;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::Role;

/// Validated identity injected into protected handlers.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub student_id: String,
    pub role: Role,
}

/// Requires a valid bearer token: well-formed and unexpired signature AND a
/// matching persisted token row. Signature validity alone is not enough;
/// deleting the row revokes the token server-side.
pub struct AuthUser(pub Identity);

/// Requires `AuthUser` to pass first, then an admin role.
pub struct AdminUser(pub Identity);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized("Authorization header is required"))?;

    header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized(
        "Authorization header format must be Bearer {token}",
    ))
}

fn rejection(err: TokenError) -> ApiError {
    match err {
        TokenError::Malformed | TokenError::Expired => {
            ApiError::Unauthorized("Invalid or expired token")
        }
        TokenError::Revoked => ApiError::Unauthorized("Token is no longer valid"),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token verification failed");
            rejection(e)
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("Invalid or expired token"));
        }

        // Liveness check: the signed payload is only trusted while its row
        // still exists in the token store.
        let row = db::bounded(UserToken::find_by_access(&state.db, token)).await?;
        if row.is_none() {
            warn!(user_id = claims.user_id, "token revoked");
            return Err(rejection(TokenError::Revoked));
        }

        Ok(AuthUser(Identity {
            user_id: claims.user_id,
            student_id: claims.student_id,
            role: claims.role,
        }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        if identity.role != Role::Admin {
            warn!(user_id = identity.user_id, "admin route denied");
            return Err(ApiError::Forbidden("Admin access required"));
        }
        Ok(AdminUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn headers_with_auth(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(
                axum::http::header::AUTHORIZATION,
                v.parse().expect("header value"),
            );
        }
        headers
    }

    #[test]
    fn bearer_token_requires_header() {
        let headers = headers_with_auth(None);
        let err = bearer_token(&headers).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_requires_bearer_scheme() {
        let headers = headers_with_auth(Some("Basic dXNlcjpwYXNz"));
        let err = bearer_token(&headers).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_strips_scheme() {
        let headers = headers_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn every_token_failure_maps_to_unauthorized() {
        for e in [TokenError::Malformed, TokenError::Expired, TokenError::Revoked] {
            assert_eq!(rejection(e).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn revoked_token_message_is_distinct() {
        assert_eq!(
            rejection(TokenError::Revoked).to_string(),
            "Token is no longer valid"
        );
        assert_eq!(
            rejection(TokenError::Expired).to_string(),
            "Invalid or expired token"
        );
    }
}
