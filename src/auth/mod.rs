//! Authentication and authorisation: password hashing, bearer tokens, the
//! request guard that verifies them, and role checks.

mod guard;
pub mod password;
mod role;
mod token;

pub use guard::{AuthFailure, Identity, AUTHORIZATION_HEADER, BEARER_SCHEME};
pub use role::{is_admin, require_admin};
pub use token::{InvalidToken, TokenService};
