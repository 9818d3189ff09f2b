use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::warn;
use rocket::tokio::time;

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, CandidatePatch, NewCandidate, NewUser, User},
    mongodb::Id,
};

use super::{Store, VoteCommit};

/// Bounds every call on the wrapped store, reporting `StoreUnavailable`
/// rather than hanging the caller.
pub struct TimeoutStore {
    inner: Arc<dyn Store>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn Store>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Store call `{op}` exceeded {:?}", self.limit);
                Err(Error::StoreUnavailable(format!(
                    "`{op}` timed out after {}ms",
                    self.limit.as_millis()
                )))
            }
        }
    }
}

#[rocket::async_trait]
impl Store for TimeoutStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        self.bounded("insert_user", self.inner.insert_user(user))
            .await
    }

    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        self.bounded("user_by_id", self.inner.user_by_id(id)).await
    }

    async fn user_by_national_id(&self, national_id: &str) -> Result<Option<User>> {
        self.bounded(
            "user_by_national_id",
            self.inner.user_by_national_id(national_id),
        )
        .await
    }

    async fn admin_exists(&self) -> Result<bool> {
        self.bounded("admin_exists", self.inner.admin_exists()).await
    }

    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool> {
        self.bounded(
            "set_password_hash",
            self.inner.set_password_hash(id, password_hash),
        )
        .await
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        self.bounded("insert_candidate", self.inner.insert_candidate(candidate))
            .await
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        self.bounded("candidate_by_id", self.inner.candidate_by_id(id))
            .await
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        self.bounded("candidates", self.inner.candidates()).await
    }

    async fn update_candidate(&self, id: Id, patch: CandidatePatch) -> Result<Option<Candidate>> {
        self.bounded("update_candidate", self.inner.update_candidate(id, patch))
            .await
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        self.bounded("delete_candidate", self.inner.delete_candidate(id))
            .await
    }

    async fn record_vote(
        &self,
        voter_id: Id,
        candidate_id: Id,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteCommit> {
        self.bounded(
            "record_vote",
            self.inner.record_vote(voter_id, candidate_id, voted_at),
        )
        .await
    }
}
