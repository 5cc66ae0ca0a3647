use serde::{Deserialize, Serialize};

use super::Pagination;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<LinoUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinoUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUserResponse {
    pub user: LinoUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub admin_verification_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// `GET /admin/status` answers either `{ "isAdmin": bool }` or a bare bool.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdminStatus {
    Flag(bool),
    Wrapped {
        #[serde(rename = "isAdmin", alias = "admin")]
        is_admin: bool,
    },
}

impl AdminStatus {
    pub fn is_admin(&self) -> bool {
        match self {
            AdminStatus::Flag(flag) => *flag,
            AdminStatus::Wrapped { is_admin } => *is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<UserSummary>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct AdminList {
    #[serde(default)]
    pub admins: Vec<UserSummary>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    pub pagination: Pagination,
}

/// Body of `POST /api/auth/admin-key`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminKeyRequest {
    pub identifier: String,
    pub password: String,
    pub admin_verification_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminKey<'a> {
    pub admin_verification_key: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminChange {
    pub username: String,
}

/// Session details returned to the browser after login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub username: String,
    pub is_super_admin: bool,
    pub redirect: String,
}
