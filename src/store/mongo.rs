use chrono::{DateTime, Utc};
use log::debug;
use mongodb::{
    bson::{doc, to_bson, to_document, Bson},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, CandidatePatch, NewCandidate, NewUser, Role, User, VoteRecord},
    mongodb::{ensure_indexes_exist, Coll, Id},
};

use super::{Store, VoteCommit};

/// How many times a vote transaction is attempted before giving up.
const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// A store backed by MongoDB.
///
/// Votes use multi-document transactions, so the server must be a replica
/// set or sharded cluster.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the given database and ensure its indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, DbError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self { client, db })
    }

    fn user_coll(&self) -> Coll<User> {
        Coll::from_db(&self.db)
    }

    fn new_user_coll(&self) -> Coll<NewUser> {
        Coll::from_db(&self.db)
    }

    fn candidate_coll(&self) -> Coll<Candidate> {
        Coll::from_db(&self.db)
    }

    fn new_candidate_coll(&self) -> Coll<NewCandidate> {
        Coll::from_db(&self.db)
    }

    /// The body of the vote transaction. Any early return leaves the
    /// transaction to be aborted by the caller.
    async fn vote_in_transaction(
        &self,
        session: &mut ClientSession,
        voter_id: Id,
        candidate_id: Id,
        vote: &Bson,
    ) -> Result<VoteCommit, DbError> {
        // Flip the voted flag only if it is still unset; this is the
        // compare-and-swap that stops a voter from committing twice.
        let not_yet_voted = doc! {
            "_id": voter_id,
            "has_voted": false,
        };
        let mark_voted = doc! {
            "$set": { "has_voted": true }
        };
        let result = self
            .user_coll()
            .update_one_with_session(not_yet_voted, mark_voted, None, session)
            .await?;
        if result.matched_count == 0 {
            return Ok(VoteCommit::VoterIneligible);
        }

        let push_vote = doc! {
            "$push": { "votes": vote.clone() },
            "$inc": { "vote_count": 1 },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let candidate = self
            .candidate_coll()
            .find_one_and_update_with_session(candidate_id.as_doc(), push_vote, options, session)
            .await?;

        Ok(match candidate {
            Some(candidate) => VoteCommit::Committed(candidate),
            None => VoteCommit::CandidateMissing,
        })
    }
}

/// Commit the session's transaction, retrying a bounded number of times
/// while the outcome is unknown.
async fn commit_with_retry(session: &mut ClientSession) -> Result<(), DbError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(err)
                if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                debug!("Vote commit result unknown (attempt {attempt}), retrying commit");
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let id: Id = self
            .new_user_coll()
            .insert_one(&user, None)
            .await?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::Internal("Inserted user has no ObjectId".to_string()))?
            .into();
        Ok(User::new(id, user))
    }

    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        Ok(self.user_coll().find_one(id.as_doc(), None).await?)
    }

    async fn user_by_national_id(&self, national_id: &str) -> Result<Option<User>> {
        let filter = doc! {
            "national_id": national_id,
        };
        Ok(self.user_coll().find_one(filter, None).await?)
    }

    async fn admin_exists(&self) -> Result<bool> {
        let filter = doc! {
            "role": Role::Admin,
        };
        Ok(self.user_coll().count_documents(filter, None).await? > 0)
    }

    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool> {
        let update = doc! {
            "$set": { "password_hash": password_hash }
        };
        let result = self.user_coll().update_one(id.as_doc(), update, None).await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let id: Id = self
            .new_candidate_coll()
            .insert_one(&candidate, None)
            .await?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::Internal("Inserted candidate has no ObjectId".to_string()))?
            .into();
        Ok(Candidate::new(id, candidate))
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidate_coll().find_one(id.as_doc(), None).await?)
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        // ObjectIds grow with creation time, so this is insertion order.
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        Ok(self
            .candidate_coll()
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn update_candidate(&self, id: Id, patch: CandidatePatch) -> Result<Option<Candidate>> {
        if patch.is_empty() {
            return self.candidate_by_id(id).await;
        }
        let fields =
            to_document(&patch).map_err(|e| Error::Internal(format!("Bad candidate patch: {e}")))?;
        let update = doc! {
            "$set": fields,
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .candidate_coll()
            .find_one_and_update(id.as_doc(), update, options)
            .await?)
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        let result = self.candidate_coll().delete_one(id.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn record_vote(
        &self,
        voter_id: Id,
        candidate_id: Id,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteCommit> {
        let vote = to_bson(&VoteRecord::new(voter_id, voted_at))
            .map_err(|e| Error::Internal(format!("Bad vote record: {e}")))?;

        let mut session = self.client.start_session(None).await?;
        let mut attempt = 1;
        loop {
            session.start_transaction(None).await?;
            let outcome = self
                .vote_in_transaction(&mut session, voter_id, candidate_id, &vote)
                .await;

            let error = match outcome {
                Ok(VoteCommit::Committed(candidate)) => match commit_with_retry(&mut session).await {
                    Ok(()) => return Ok(VoteCommit::Committed(candidate)),
                    Err(err) => err,
                },
                Ok(refused) => {
                    session.abort_transaction().await?;
                    return Ok(refused);
                }
                Err(err) => {
                    // The server may already have aborted; nothing more to undo.
                    let _ = session.abort_transaction().await;
                    err
                }
            };

            let transient = error.contains_label(TRANSIENT_TRANSACTION_ERROR);
            if transient && attempt < MAX_TRANSACTION_ATTEMPTS {
                debug!(
                    "Vote transaction for voter {voter_id} hit a transient error \
                     (attempt {attempt}), retrying: {error}"
                );
                attempt += 1;
                continue;
            }
            return Err(error.into());
        }
    }
}
