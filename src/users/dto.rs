use serde::{Deserialize, Serialize};

use crate::users::repo::User;

/// Partial profile patch; absent fields are left untouched. Role and
/// password are deliberately not patchable through this surface.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user_id: i64,
    pub user_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub update_user: User,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserParams {
    pub user_id: i64,
}
