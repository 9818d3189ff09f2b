//! Persistence for users and candidates.
//!
//! [`Store`] is the seam between the request handlers and the database. The
//! production implementation is [`MongoStore`]; [`MemoryStore`] backs tests
//! and single-process deployments. [`Db::with_timeout`] wraps either in
//! [`TimeoutStore`] to bound every call.

use std::{ops::Deref, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    db::{Candidate, CandidatePatch, NewCandidate, NewUser, User},
    mongodb::Id,
};

mod memory;
mod mongo;
mod timeout;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use timeout::TimeoutStore;

#[cfg(test)]
mod failing;
#[cfg(test)]
pub use failing::{FailingStore, StallingStore};

/// What happened when a vote was offered to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteCommit {
    /// Both records were updated; holds the candidate as of the commit.
    Committed(Candidate),
    /// The voter was missing or had already voted; nothing was changed.
    VoterIneligible,
    /// The candidate was missing; nothing was changed.
    CandidateMissing,
}

#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Insert a user, failing with `Conflict` if the national ID is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn user_by_id(&self, id: Id) -> Result<Option<User>>;

    async fn user_by_national_id(&self, national_id: &str) -> Result<Option<User>>;

    /// Is there at least one admin?
    async fn admin_exists(&self) -> Result<bool>;

    /// Replace a user's password hash. Returns false if the user does not exist.
    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool>;

    /// Insert a candidate, failing with `Conflict` if the party is taken.
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>>;

    /// All candidates, in insertion order.
    async fn candidates(&self) -> Result<Vec<Candidate>>;

    /// Apply a patch, returning the updated candidate, or `None` if it does not exist.
    async fn update_candidate(&self, id: Id, patch: CandidatePatch) -> Result<Option<Candidate>>;

    /// Returns false if the candidate did not exist.
    async fn delete_candidate(&self, id: Id) -> Result<bool>;

    /// Atomically record a vote.
    ///
    /// Only succeeds if the voter exists with `has_voted == false` and the
    /// candidate exists, in which case the voter is marked as having voted
    /// and the candidate's ledger and tally both grow by one. Otherwise
    /// neither record changes.
    async fn record_vote(
        &self,
        voter_id: Id,
        candidate_id: Id,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteCommit>;
}

/// A shared handle on the managed store, usable as a request guard.
#[derive(Clone)]
pub struct Db(Arc<dyn Store>);

impl Db {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self(store)
    }

    /// Bound every call on this store by `limit`.
    pub fn with_timeout(self, limit: Duration) -> Self {
        Self(Arc::new(TimeoutStore::new(self.0, limit)))
    }
}

impl Deref for Db {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Db {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Panics iff the [`Db`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Db>>().await.unwrap();
        request::Outcome::Success(db.inner().clone())
    }
}
