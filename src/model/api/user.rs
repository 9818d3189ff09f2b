use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    db::{Role, User},
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A signup request. The password is plaintext and is hashed before storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    pub address: String,
    pub national_id: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub national_id: String,
    pub password: String,
}

/// A request to replace the caller's password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// A user as shown to API clients: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: ApiId,
    pub name: String,
    pub age: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub address: String,
    pub national_id: String,
    pub role: Role,
    pub has_voted: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            name: user.user.name,
            age: user.user.age,
            email: user.user.email,
            mobile: user.user.mobile,
            address: user.user.address,
            national_id: user.user.national_id,
            role: user.user.role,
            has_voted: user.user.has_voted,
        }
    }
}

/// Response to a successful signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user: UserProfile,
    pub token: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
