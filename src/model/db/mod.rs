//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Password hashes are included; these types must never be returned
//!   directly from an endpoint.

mod candidate;
pub use candidate::{Candidate, CandidateCore, CandidatePatch, NewCandidate, VoteRecord};

mod role;
pub use role::Role;

mod user;
pub use user::{NewUser, User, UserCore};

#[cfg(test)]
pub use user::EXAMPLE_PASSWORD;
