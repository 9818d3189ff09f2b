use log::debug;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::auth::TokenService;
use crate::error::Error;
use crate::model::mongodb::Id;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const BEARER_SCHEME: &str = "Bearer";

/// The verified identity behind a request.
///
/// Only the user ID is resolved here; the role is looked up on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Id,
}

impl Identity {
    /// Resolve an identity from the raw `Authorization` header value, if any.
    pub fn from_header(header: Option<&str>, tokens: &TokenService) -> Result<Self, Error> {
        let header = header
            .ok_or_else(|| Error::Unauthenticated("No authorization header provided".to_string()))?;
        let token = bearer_token(header)
            .ok_or_else(|| Error::Unauthenticated("No token provided".to_string()))?;
        let user_id = tokens
            .verify(token)
            .map_err(|err| Error::Unauthenticated(format!("Invalid token: {err}")))?;
        Ok(Self { user_id })
    }
}

/// Extract the token from `Bearer <token>`.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || parts.next().is_some() {
        return None;
    }
    Some(token)
}

/// The most recent authentication failure for a request, kept so the
/// catcher can report it.
#[derive(Debug, Default)]
pub struct AuthFailure(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = Error;

    /// Verify the bearer token. Never touches the store.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `TokenService` is always managed.
        let tokens = req.guard::<&State<TokenService>>().await.unwrap();

        match Identity::from_header(req.headers().get_one(AUTHORIZATION_HEADER), tokens) {
            Ok(identity) => Outcome::Success(identity),
            Err(err) => {
                debug!("Rejected credentials: {err}");
                req.local_cache(|| AuthFailure(Some(err.to_string())));
                Outcome::Failure((Status::Unauthorized, err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"guard test secret", None)
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let err = Identity::from_header(None, &service()).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[test]
    fn header_without_token_is_unauthenticated() {
        for header in ["", "Bearer", "Bearer ", "Token abc", "Bearer a b"] {
            let err = Identity::from_header(Some(header), &service()).unwrap_err();
            assert!(matches!(err, Error::Unauthenticated(_)), "{header:?}");
        }
    }

    #[test]
    fn bad_token_is_unauthenticated() {
        let err = Identity::from_header(Some("Bearer x.y.z"), &service()).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[test]
    fn valid_token_resolves_its_subject() {
        let tokens = service();
        let id = Id::new();
        let header = format!("Bearer {}", tokens.issue(id).unwrap());
        let identity = Identity::from_header(Some(&header), &tokens).unwrap();
        assert_eq!(id, identity.user_id);
    }
}
