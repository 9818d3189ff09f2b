use chrono::Utc;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, Role},
    mongodb::Id,
};
use crate::service::parse_id;
use crate::store::{Store, VoteCommit};

/// Cast the voter's single vote for a candidate.
///
/// Checks run in a fixed order and the first failure wins:
///
/// 1. the candidate reference is well-formed (`InvalidReference`),
/// 2. the candidate exists (`NotFound`),
/// 3. the voter exists (`NotFound`),
/// 4. the voter has not voted yet (`AlreadyVoted`),
/// 5. the voter is not an admin (`Forbidden`).
///
/// The vote itself is then committed by [`Store::record_vote`], which
/// re-checks the voted flag atomically with both updates. A concurrent vote
/// by the same voter that wins the race therefore turns this one into
/// `AlreadyVoted`, and a retried request after a commit fails at check 4.
/// Votes are irrevocable.
pub async fn cast_vote(store: &dyn Store, voter_id: Id, candidate_ref: &str) -> Result<Candidate> {
    let candidate_id = parse_id(candidate_ref, "candidate")?;

    store
        .candidate_by_id(candidate_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;

    let voter = store
        .user_by_id(voter_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User with ID '{voter_id}'")))?;

    if voter.has_voted {
        warn!("User {voter_id} tried to vote again");
        return Err(Error::AlreadyVoted);
    }

    match voter.role {
        Role::Admin => {
            warn!("Admin {voter_id} tried to vote");
            return Err(Error::Forbidden("Admins are not allowed to vote".to_string()));
        }
        Role::Voter => {}
    }

    match store.record_vote(voter_id, candidate_id, Utc::now()).await? {
        VoteCommit::Committed(candidate) => {
            info!("Recorded vote by {voter_id} for candidate {candidate_id}");
            Ok(candidate)
        }
        VoteCommit::VoterIneligible => {
            warn!("User {voter_id} lost a race to vote twice");
            Err(Error::AlreadyVoted)
        }
        VoteCommit::CandidateMissing => Err(Error::not_found(format!(
            "Candidate with ID '{candidate_id}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::futures::future::join_all;

    use super::*;
    use crate::model::db::{NewCandidate, NewUser, User};
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, User, Candidate, Candidate) {
        let store = MemoryStore::new();
        let voter = store.insert_user(NewUser::example_voter()).await.unwrap();
        let x = store.insert_candidate(NewCandidate::example()).await.unwrap();
        let y = store.insert_candidate(NewCandidate::example2()).await.unwrap();
        (store, voter, x, y)
    }

    async fn assert_ledgers_consistent(store: &dyn Store) {
        for candidate in store.candidates().await.unwrap() {
            assert!(candidate.is_consistent(), "{candidate:?}");
        }
    }

    #[rocket::async_test]
    async fn first_vote_is_recorded() {
        let (store, voter, x, _) = setup().await;

        let snapshot = cast_vote(&store, voter.id, &x.id.to_string()).await.unwrap();

        assert_eq!(x.id, snapshot.id);
        assert_eq!(1, snapshot.vote_count);
        assert_eq!(voter.id, snapshot.votes[0].voter_id);
        assert!(store.user_by_id(voter.id).await.unwrap().unwrap().has_voted);
    }

    #[rocket::async_test]
    async fn second_vote_is_refused_even_for_another_candidate() {
        let (store, voter, x, y) = setup().await;
        cast_vote(&store, voter.id, &x.id.to_string()).await.unwrap();

        let err = cast_vote(&store, voter.id, &y.id.to_string()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));

        // A retry of the original request is refused too.
        let err = cast_vote(&store, voter.id, &x.id.to_string()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));

        let x = store.candidate_by_id(x.id).await.unwrap().unwrap();
        let y = store.candidate_by_id(y.id).await.unwrap().unwrap();
        assert_eq!(1, x.vote_count);
        assert_eq!(0, y.vote_count);
        assert_ledgers_consistent(&store).await;
    }

    #[rocket::async_test]
    async fn admins_cannot_vote() {
        let (store, _, x, _) = setup().await;
        let admin = store.insert_user(NewUser::example_admin()).await.unwrap();

        let err = cast_vote(&store, admin.id, &x.id.to_string()).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        assert_eq!(0, store.candidate_by_id(x.id).await.unwrap().unwrap().vote_count);
        assert!(!store.user_by_id(admin.id).await.unwrap().unwrap().has_voted);
    }

    #[rocket::async_test]
    async fn malformed_candidate_is_invalid_reference() {
        let (store, voter, _, _) = setup().await;
        let err = cast_vote(&store, voter.id, "not-an-id").await.unwrap_err();
        assert!(matches!(err, Error::InvalidReference(_)));
    }

    #[rocket::async_test]
    async fn missing_candidate_is_not_found() {
        let (store, voter, _, _) = setup().await;
        let err = cast_vote(&store, voter.id, &Id::new().to_string()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref what) if what.starts_with("Candidate")));
        assert!(!store.user_by_id(voter.id).await.unwrap().unwrap().has_voted);
    }

    #[rocket::async_test]
    async fn missing_voter_is_not_found() {
        let (store, _, x, _) = setup().await;
        let err = cast_vote(&store, Id::new(), &x.id.to_string()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref what) if what.starts_with("User")));
    }

    #[rocket::async_test]
    async fn malformed_reference_is_checked_before_voter() {
        let store = MemoryStore::new();
        // Neither the voter nor any candidate exists, yet the reference error wins.
        let err = cast_vote(&store, Id::new(), "xyz").await.unwrap_err();
        assert!(matches!(err, Error::InvalidReference(_)));
    }

    #[rocket::async_test]
    async fn already_voted_is_checked_before_role() {
        let (store, _, x, _) = setup().await;
        let mut admin = NewUser::example_admin();
        admin.has_voted = true;
        let admin = store.insert_user(admin).await.unwrap();

        let err = cast_vote(&store, admin.id, &x.id.to_string()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));
    }

    #[rocket::async_test]
    async fn concurrent_votes_by_one_voter_commit_once() {
        const ATTEMPTS: usize = 16;

        let store = Arc::new(MemoryStore::new());
        let voter = store.insert_user(NewUser::example_voter()).await.unwrap();
        let mut candidate_ids = Vec::new();
        for i in 0..ATTEMPTS {
            let candidate = NewCandidate::new(format!("Candidate {i}"), format!("Party {i}"), 40);
            candidate_ids.push(store.insert_candidate(candidate).await.unwrap().id);
        }

        let voter_id = voter.id;
        let tasks = candidate_ids.iter().map(|candidate_id| {
            let store = Arc::clone(&store);
            let candidate_ref = candidate_id.to_string();
            rocket::tokio::spawn(async move { cast_vote(&*store, voter_id, &candidate_ref).await })
        });
        let results = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect::<Vec<_>>();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let already_voted = results
            .iter()
            .filter(|r| matches!(r, Err(Error::AlreadyVoted)))
            .count();
        assert_eq!(1, successes);
        assert_eq!(ATTEMPTS - 1, already_voted);

        let tallies = store
            .candidates()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.vote_count)
            .collect::<Vec<_>>();
        assert_eq!(1, tallies.iter().sum::<u64>());
        assert_eq!(1, tallies.iter().filter(|&&count| count == 1).count());
        assert_ledgers_consistent(&*store).await;
    }

    #[rocket::async_test]
    async fn concurrent_votes_by_many_voters_all_count() {
        const VOTERS: usize = 12;

        let store = Arc::new(MemoryStore::new());
        let x = store.insert_candidate(NewCandidate::example()).await.unwrap();
        let template = NewUser::example_voter();
        let mut voter_ids = Vec::new();
        for i in 0..VOTERS {
            let voter = NewUser {
                national_id: format!("voter-{i}"),
                ..template.clone()
            };
            voter_ids.push(store.insert_user(voter).await.unwrap().id);
        }

        let tasks = voter_ids.iter().copied().map(|voter_id| {
            let store = Arc::clone(&store);
            let candidate_ref = x.id.to_string();
            rocket::tokio::spawn(async move { cast_vote(&*store, voter_id, &candidate_ref).await })
        });
        for joined in join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        let x = store.candidate_by_id(x.id).await.unwrap().unwrap();
        assert_eq!(VOTERS as u64, x.vote_count);
        assert!(x.is_consistent());
    }
}
