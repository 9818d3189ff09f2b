//! API-friendly types: request bodies and response payloads.
//!
//! IDs are serialised as plain strings and secrets are never included.

mod candidate;
pub use candidate::{
    CandidateDescription, CandidateSpec, CandidateSummary, VoteCount, VoteDescription,
};

mod id;
pub use id::ApiId;

mod message;
pub use message::Message;

mod user;
pub use user::{
    Credentials, PasswordChange, SignupRequest, SignupResponse, TokenResponse, UserProfile,
    MIN_PASSWORD_LENGTH,
};
