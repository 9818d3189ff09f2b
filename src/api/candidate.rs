use rocket::{serde::json::Json, Route};

use crate::{
    auth::Identity,
    error::Result,
    model::{
        api::{CandidateDescription, CandidateSpec, CandidateSummary, Message, VoteCount},
        db::CandidatePatch,
    },
    service::{candidates, voting},
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![list, vote_counts, create, update, delete, vote]
}

#[get("/candidate")]
async fn list(db: Db) -> Result<Json<Vec<CandidateSummary>>> {
    candidates::list(&*db).await.map(Json)
}

#[get("/candidate/vote/count")]
async fn vote_counts(db: Db) -> Result<Json<Vec<VoteCount>>> {
    candidates::vote_counts(&*db).await.map(Json)
}

#[post("/candidate", data = "<spec>", format = "json")]
async fn create(
    identity: Identity,
    spec: Json<CandidateSpec>,
    db: Db,
) -> Result<Json<CandidateDescription>> {
    let candidate = candidates::create(&*db, &identity, spec.0).await?;
    Ok(Json(candidate.into()))
}

#[put("/candidate/<candidate_id>", data = "<patch>", format = "json")]
async fn update(
    identity: Identity,
    candidate_id: &str,
    patch: Json<CandidatePatch>,
    db: Db,
) -> Result<Json<CandidateDescription>> {
    let candidate = candidates::update(&*db, &identity, candidate_id, patch.0).await?;
    Ok(Json(candidate.into()))
}

#[delete("/candidate/<candidate_id>")]
async fn delete(identity: Identity, candidate_id: &str, db: Db) -> Result<Json<Message>> {
    candidates::delete(&*db, &identity, candidate_id).await?;
    Ok(Json(Message::new("Candidate deleted successfully")))
}

#[post("/candidate/vote/<candidate_id>")]
async fn vote(identity: Identity, candidate_id: &str, db: Db) -> Result<Json<CandidateDescription>> {
    let candidate = voting::cast_vote(&*db, identity.user_id, candidate_id).await?;
    Ok(Json(candidate.into()))
}
