use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single vote in a candidate's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter_id: Id,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

impl VoteRecord {
    pub fn new(voter_id: Id, voted_at: DateTime<Utc>) -> Self {
        Self { voter_id, voted_at }
    }
}

/// Core candidate data, as stored in the database.
///
/// `vote_count` always equals `votes.len()`; both are only ever changed
/// together by the store's vote primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    /// Unique across candidates.
    pub party: String,
    pub age: u32,
    pub vote_count: u64,
    pub votes: Vec<VoteRecord>,
}

impl CandidateCore {
    /// A fresh candidate with an empty ledger.
    pub fn new(name: String, party: String, age: u32) -> Self {
        Self {
            name,
            party,
            age,
            vote_count: 0,
            votes: Vec::new(),
        }
    }

    /// Append a vote to the ledger, keeping the tally in step.
    pub fn push_vote(&mut self, vote: VoteRecord) {
        self.votes.push(vote);
        self.vote_count += 1;
    }

    pub fn is_consistent(&self) -> bool {
        self.vote_count == self.votes.len() as u64
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Candidate {
    pub fn new(id: Id, candidate: CandidateCore) -> Self {
        Self { id, candidate }
    }
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// The admin-editable fields of a candidate. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

impl CandidatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.party.is_none() && self.age.is_none()
    }

    pub fn apply(&self, candidate: &mut CandidateCore) {
        if let Some(name) = &self.name {
            candidate.name = name.clone();
        }
        if let Some(party) = &self.party {
            candidate.party = party.clone();
        }
        if let Some(age) = self.age {
            candidate.age = age;
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self::new("Meera Nair".to_string(), "Lotus Front".to_string(), 52)
        }

        pub fn example2() -> Self {
            Self::new("Arjun Das".to_string(), "River Alliance".to_string(), 47)
        }

        pub fn example3() -> Self {
            Self::new("Kiran Rao".to_string(), "Harvest Party".to_string(), 61)
        }
    }
}
