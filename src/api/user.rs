use rocket::{serde::json::Json, Route, State};

use crate::{
    auth::{Identity, TokenService},
    error::Result,
    model::api::{
        Credentials, Message, PasswordChange, SignupRequest, SignupResponse, TokenResponse,
        UserProfile,
    },
    service::users,
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![signup, login, profile, change_password]
}

#[post("/user/signup", data = "<request>", format = "json")]
async fn signup(
    request: Json<SignupRequest>,
    db: Db,
    tokens: &State<TokenService>,
) -> Result<Json<SignupResponse>> {
    users::signup(&*db, tokens, request.0).await.map(Json)
}

#[post("/user/login", data = "<credentials>", format = "json")]
async fn login(
    credentials: Json<Credentials>,
    db: Db,
    tokens: &State<TokenService>,
) -> Result<Json<TokenResponse>> {
    users::login(&*db, tokens, credentials.0).await.map(Json)
}

#[get("/user/profile")]
async fn profile(identity: Identity, db: Db) -> Result<Json<UserProfile>> {
    users::profile(&*db, &identity).await.map(Json)
}

#[put("/user/profile/password", data = "<change>", format = "json")]
async fn change_password(
    identity: Identity,
    change: Json<PasswordChange>,
    db: Db,
) -> Result<Json<Message>> {
    users::change_password(&*db, &identity, change.0).await?;
    Ok(Json(Message::new("Password updated successfully")))
}
