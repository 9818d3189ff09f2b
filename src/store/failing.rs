use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, CandidatePatch, NewCandidate, NewUser, User},
    mongodb::Id,
};

use super::{Store, VoteCommit};

/// A store whose every call fails as if the database were unreachable.
pub struct FailingStore;

fn down<T>() -> Result<T> {
    Err(Error::StoreUnavailable("store is down".to_string()))
}

#[rocket::async_trait]
impl Store for FailingStore {
    async fn insert_user(&self, _user: NewUser) -> Result<User> {
        down()
    }

    async fn user_by_id(&self, _id: Id) -> Result<Option<User>> {
        down()
    }

    async fn user_by_national_id(&self, _national_id: &str) -> Result<Option<User>> {
        down()
    }

    async fn admin_exists(&self) -> Result<bool> {
        down()
    }

    async fn set_password_hash(&self, _id: Id, _password_hash: String) -> Result<bool> {
        down()
    }

    async fn insert_candidate(&self, _candidate: NewCandidate) -> Result<Candidate> {
        down()
    }

    async fn candidate_by_id(&self, _id: Id) -> Result<Option<Candidate>> {
        down()
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        down()
    }

    async fn update_candidate(&self, _id: Id, _patch: CandidatePatch) -> Result<Option<Candidate>> {
        down()
    }

    async fn delete_candidate(&self, _id: Id) -> Result<bool> {
        down()
    }

    async fn record_vote(
        &self,
        _voter_id: Id,
        _candidate_id: Id,
        _voted_at: DateTime<Utc>,
    ) -> Result<VoteCommit> {
        down()
    }
}

/// A store whose every call hangs forever, as if the database stopped responding.
pub struct StallingStore;

async fn stall<T>() -> Result<T> {
    std::future::pending().await
}

#[rocket::async_trait]
impl Store for StallingStore {
    async fn insert_user(&self, _user: NewUser) -> Result<User> {
        stall().await
    }

    async fn user_by_id(&self, _id: Id) -> Result<Option<User>> {
        stall().await
    }

    async fn user_by_national_id(&self, _national_id: &str) -> Result<Option<User>> {
        stall().await
    }

    async fn admin_exists(&self) -> Result<bool> {
        stall().await
    }

    async fn set_password_hash(&self, _id: Id, _password_hash: String) -> Result<bool> {
        stall().await
    }

    async fn insert_candidate(&self, _candidate: NewCandidate) -> Result<Candidate> {
        stall().await
    }

    async fn candidate_by_id(&self, _id: Id) -> Result<Option<Candidate>> {
        stall().await
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        stall().await
    }

    async fn update_candidate(&self, _id: Id, _patch: CandidatePatch) -> Result<Option<Candidate>> {
        stall().await
    }

    async fn delete_candidate(&self, _id: Id) -> Result<bool> {
        stall().await
    }

    async fn record_vote(
        &self,
        _voter_id: Id,
        _candidate_id: Id,
        _voted_at: DateTime<Utc>,
    ) -> Result<VoteCommit> {
        stall().await
    }
}
