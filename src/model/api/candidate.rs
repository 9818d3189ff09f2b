use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    db::{Candidate, NewCandidate, VoteRecord},
};

/// An admin's description of a new candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
    pub age: u32,
}

impl From<CandidateSpec> for NewCandidate {
    fn from(spec: CandidateSpec) -> Self {
        NewCandidate::new(spec.name, spec.party, spec.age)
    }
}

/// A ledger entry as shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDescription {
    pub voter_id: ApiId,
    pub voted_at: DateTime<Utc>,
}

impl From<VoteRecord> for VoteDescription {
    fn from(vote: VoteRecord) -> Self {
        Self {
            voter_id: vote.voter_id.into(),
            voted_at: vote.voted_at,
        }
    }
}

/// A full candidate snapshot, including its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub party: String,
    pub age: u32,
    pub vote_count: u64,
    pub votes: Vec<VoteDescription>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            name: core.name,
            party: core.party,
            age: core.age,
            vote_count: core.vote_count,
            votes: core.votes.into_iter().map(Into::into).collect(),
        }
    }
}

/// The public listing entry for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub party: String,
}

impl From<Candidate> for CandidateSummary {
    fn from(candidate: Candidate) -> Self {
        Self {
            name: candidate.candidate.name,
            party: candidate.candidate.party,
        }
    }
}

/// A party's current tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub party: String,
    pub count: u64,
}
