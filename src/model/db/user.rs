use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::model::{db::Role, mongodb::Id};

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub address: String,
    /// Unique and immutable; the login name.
    pub national_id: String,
    pub password_hash: String,
    pub role: Role,
    pub has_voted: bool,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        password::verify(&self.password_hash, password)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl User {
    pub fn new(id: Id, user: UserCore) -> Self {
        Self { id, user }
    }
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}


#[cfg(test)]
pub use examples::EXAMPLE_PASSWORD;
