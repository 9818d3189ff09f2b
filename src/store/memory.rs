use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, CandidatePatch, NewCandidate, NewUser, Role, User, VoteRecord},
    mongodb::Id,
};

use super::{Store, VoteCommit};

/// A store held entirely in process memory.
///
/// One lock covers both tables, so every operation (including
/// [`Store::record_vote`]) is trivially atomic. IDs are ObjectIds, which sort
/// in creation order within a process, so map order is insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<Id, User>,
    candidates: BTreeMap<Id, Candidate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.national_id == user.national_id)
        {
            return Err(Error::Conflict("national_id".to_string()));
        }
        let user = User::new(Id::new(), user);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_national_id(&self, national_id: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|user| user.national_id == national_id)
            .cloned())
    }

    async fn admin_exists(&self) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(|user| user.role == Role::Admin))
    }

    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let mut tables = self.tables.write().await;
        if tables
            .candidates
            .values()
            .any(|existing| existing.party == candidate.party)
        {
            return Err(Error::Conflict("party".to_string()));
        }
        let candidate = Candidate::new(Id::new(), candidate);
        tables.candidates.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.tables.read().await.candidates.get(&id).cloned())
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .tables
            .read()
            .await
            .candidates
            .values()
            .cloned()
            .collect())
    }

    async fn update_candidate(&self, id: Id, patch: CandidatePatch) -> Result<Option<Candidate>> {
        let mut tables = self.tables.write().await;
        if let Some(party) = &patch.party {
            if tables
                .candidates
                .values()
                .any(|other| other.id != id && &other.party == party)
            {
                return Err(Error::Conflict("party".to_string()));
            }
        }
        Ok(tables.candidates.get_mut(&id).map(|candidate| {
            patch.apply(candidate);
            candidate.clone()
        }))
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        Ok(self.tables.write().await.candidates.remove(&id).is_some())
    }

    async fn record_vote(
        &self,
        voter_id: Id,
        candidate_id: Id,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteCommit> {
        let mut tables = self.tables.write().await;
        let Tables { users, candidates } = &mut *tables;

        let Some(voter) = users.get_mut(&voter_id).filter(|voter| !voter.has_voted) else {
            return Ok(VoteCommit::VoterIneligible);
        };
        let Some(candidate) = candidates.get_mut(&candidate_id) else {
            return Ok(VoteCommit::CandidateMissing);
        };

        candidate.push_vote(VoteRecord::new(voter_id, voted_at));
        voter.has_voted = true;
        Ok(VoteCommit::Committed(candidate.clone()))
    }
}
