//! The operations behind each endpoint, independent of HTTP.
//!
//! Handlers in [`crate::api`] only unpack requests and call into here, so
//! every rule can be exercised directly against a [`crate::store::Store`].

pub mod candidates;
pub mod users;
pub mod voting;

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// Parse a client-supplied identifier, distinguishing a malformed reference
/// from one that simply matches nothing.
pub fn parse_id(raw: &str, what: &str) -> Result<Id> {
    raw.parse()
        .map_err(|_| Error::InvalidReference(format!("Invalid {what} ID '{raw}'")))
}
