use std::fmt::Display;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

/// Different privilege levels.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Voter,
    Admin,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        Bson::String(role.to_string())
    }
}
