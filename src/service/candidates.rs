use log::info;

use crate::auth::{require_admin, Identity};
use crate::error::{Error, Result};
use crate::model::{
    api::{CandidateSpec, CandidateSummary, VoteCount},
    db::{Candidate, CandidatePatch, NewCandidate},
};
use crate::service::parse_id;
use crate::store::Store;

/// The public candidate listing.
pub async fn list(store: &dyn Store) -> Result<Vec<CandidateSummary>> {
    let candidates = store.candidates().await?;
    if candidates.is_empty() {
        return Err(Error::not_found("No candidates"));
    }
    Ok(candidates.into_iter().map(Into::into).collect())
}

/// Each party's tally, highest first. Ties keep listing order.
pub async fn vote_counts(store: &dyn Store) -> Result<Vec<VoteCount>> {
    let mut candidates = store.candidates().await?;
    if candidates.is_empty() {
        return Err(Error::not_found("No candidates"));
    }
    candidates.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
    Ok(candidates
        .into_iter()
        .map(|candidate| VoteCount {
            party: candidate.candidate.party,
            count: candidate.candidate.vote_count,
        })
        .collect())
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

pub async fn create(store: &dyn Store, identity: &Identity, spec: CandidateSpec) -> Result<Candidate> {
    require_admin(store, identity, "add candidates").await?;
    require_text(&spec.name, "name")?;
    require_text(&spec.party, "party")?;

    let candidate = store.insert_candidate(NewCandidate::from(spec)).await?;
    info!("Admin {} created candidate {}", identity.user_id, candidate.id);
    Ok(candidate)
}

/// Change a candidate's name, party, or age. The tally is not editable.
pub async fn update(
    store: &dyn Store,
    identity: &Identity,
    candidate_ref: &str,
    patch: CandidatePatch,
) -> Result<Candidate> {
    require_admin(store, identity, "update candidates").await?;
    let candidate_id = parse_id(candidate_ref, "candidate")?;
    if let Some(name) = &patch.name {
        require_text(name, "name")?;
    }
    if let Some(party) = &patch.party {
        require_text(party, "party")?;
    }

    let candidate = store
        .update_candidate(candidate_id, patch)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;
    info!("Admin {} updated candidate {candidate_id}", identity.user_id);
    Ok(candidate)
}

pub async fn delete(store: &dyn Store, identity: &Identity, candidate_ref: &str) -> Result<()> {
    require_admin(store, identity, "delete candidates").await?;
    let candidate_id = parse_id(candidate_ref, "candidate")?;

    if !store.delete_candidate(candidate_id).await? {
        return Err(Error::not_found(format!("Candidate with ID '{candidate_id}'")));
    }
    info!("Admin {} deleted candidate {candidate_id}", identity.user_id);
    Ok(())
}
