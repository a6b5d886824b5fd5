use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::config::JwtConfig;
use crate::state::AppState;
use crate::users::repo::{Role, User};

/// Token type used to distinguish the access and refresh halves of a pair.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed payload carried by every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user_id: i64,
    pub student_id: String,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
}

/// Why a token string failed validation. The auth guard collapses all of
/// these into 401 at the boundary; tests can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token revoked")]
    Revoked,
}

/// HS256 signing and verification keys plus token configuration.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: Duration::from_secs((cfg.ttl_hours as u64) * 3600),
        }
    }

    fn sign_with_kind(&self, user: &User, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user_id: user.user_id,
            student_id: user.student_id.clone(),
            role: user.role,
            kind,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = user.user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    /// Signs the (access, refresh) pair for a user.
    pub fn sign_pair(&self, user: &User) -> anyhow::Result<(String, String)> {
        let access = self.sign_with_kind(user, TokenKind::Access)?;
        let refresh = self.sign_with_kind(user, TokenKind::Refresh)?;
        Ok((access, refresh))
    }

    /// Checks signature, shape, issuer and embedded expiry. Liveness against
    /// the persisted token store is the guard's second step, not done here.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;
        debug!(user_id = data.claims.user_id, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "packdepot".into(),
            ttl_hours: 1,
        })
    }

    fn make_user() -> User {
        User {
            user_id: 42,
            user_name: "Kei".into(),
            password_hash: "hash".into(),
            student_id: "S-2024-001".into(),
            phone: "13800000000".into(),
            address: "Dorm 3".into(),
            role: Role::User,
            register_time: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip_recovers_identity() {
        let keys = make_keys();
        let user = make_user();
        let (access, refresh) = keys.sign_pair(&user).expect("sign pair");

        let claims = keys.verify(&access).expect("verify access");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.student_id, "S-2024-001");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.iss, "packdepot");

        let claims = keys.verify(&refresh).expect("verify refresh");
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn verify_rejects_garbage_as_malformed() {
        let keys = make_keys();
        assert_eq!(keys.verify("not.a.jwt").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn verify_rejects_wrong_secret_as_malformed() {
        let keys = make_keys();
        let other = JwtKeys::new(&JwtConfig {
            secret: "other-secret".into(),
            issuer: "packdepot".into(),
            ttl_hours: 1,
        });
        let (access, _) = keys.sign_pair(&make_user()).expect("sign pair");
        assert_eq!(other.verify(&access).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn verify_rejects_wrong_issuer_as_malformed() {
        let keys = make_keys();
        let other = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "someone-else".into(),
            ttl_hours: 1,
        });
        let (access, _) = other.sign_pair(&make_user()).expect("sign pair");
        assert_eq!(keys.verify(&access).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn verify_rejects_expired_token_as_expired() {
        let keys = make_keys();
        let user = make_user();
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = Claims {
            user_id: user.user_id,
            student_id: user.student_id.clone(),
            role: user.role,
            kind: TokenKind::Access,
            iat: past.unix_timestamp() as usize,
            exp: (past + TimeDuration::hours(1)).unix_timestamp() as usize,
            iss: "packdepot".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }
}
