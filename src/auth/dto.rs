use serde::{Deserialize, Serialize};

use crate::users::repo::{Role, User};

/// Request body for user registration. Role is optional and defaults to
/// `user`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    pub student_id: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub student_id: String,
    pub password: String,
}

/// Response returned after register or login: the user plus the signed
/// token pair.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
