use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::auth::AuthFailure;
use crate::error::{ErrorBody, ErrorKind};

mod candidate;
mod user;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![welcome];
    routes.extend(user::routes());
    routes.extend(candidate::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, default]
}

#[get("/")]
fn welcome() -> &'static str {
    "Welcome to the Voting App"
}

/// Failed request guards carry no body, so report the reason recorded by the
/// authentication guard instead.
#[catch(401)]
fn unauthorized(req: &Request) -> Json<ErrorBody> {
    let message = req
        .local_cache(AuthFailure::default)
        .0
        .clone()
        .unwrap_or_else(|| "Authentication required".to_string());
    Json(ErrorBody {
        kind: ErrorKind::Unauthenticated,
        message,
    })
}

#[catch(default)]
fn default(status: Status, _req: &Request) -> Json<ErrorBody> {
    let kind = match status.code {
        400 | 422 => ErrorKind::BadRequest,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        503 => ErrorKind::StoreUnavailable,
        _ => ErrorKind::Internal,
    };
    Json(ErrorBody {
        kind,
        message: status.reason_lossy().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;

    #[backend_test]
    async fn welcome_message(client: Client) {
        let response = client.get(uri!(welcome)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            "Welcome to the Voting App",
            response.into_string().await.unwrap()
        );
    }

    #[backend_test]
    async fn unknown_route_is_json_not_found(client: Client) {
        let response = client.get("/ballot").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let error: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(ErrorKind::NotFound, error.kind);
    }
}
