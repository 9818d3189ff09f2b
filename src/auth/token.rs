use std::collections::HashSet;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::error::Result;
use crate::model::mongodb::Id;

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidToken {
    #[error("token has expired")]
    Expired,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("token subject is not a valid user ID")]
    BadSubject,
}

/// Token claims: the subject plus issue and optional expiry timestamps.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Issues and verifies signed, stateless bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Option<Duration>,
}

impl TokenService {
    /// Create a service signing with `secret`. Tokens expire after `ttl` if one is given.
    pub fn new(secret: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.jwt_secret(), config.auth_ttl())
    }

    /// Mint a token for the given user.
    pub fn issue(&self, user_id: Id) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check a token's signature (and expiry, if enabled), returning its subject.
    pub fn verify(&self, token: &str) -> Result<Id, InvalidToken> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation())
            .map_err(|err| match err.into_kind() {
                JwtErrorKind::ExpiredSignature => InvalidToken::Expired,
                JwtErrorKind::InvalidSignature => InvalidToken::BadSignature,
                _ => InvalidToken::Malformed,
            })?
            .claims;
        claims.sub.parse().map_err(|_| InvalidToken::BadSubject)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();
        if self.ttl.is_some() {
            validation.set_required_spec_claims(&["exp"]);
        } else {
            validation.validate_exp = false;
        }
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"a secret that is only used in tests";

    #[test]
    fn issued_tokens_verify_to_their_subject() {
        let service = TokenService::new(SECRET, None);
        let id = Id::new();
        let token = service.issue(id).unwrap();
        assert_eq!(Ok(id), service.verify(&token));
    }

    #[test]
    fn signature_is_deterministic() {
        let service = TokenService::new(SECRET, None);
        let header = Header::new(Algorithm::HS256);
        let claims = Claims {
            sub: Id::new().to_string(),
            iat: 1_700_000_000,
            exp: None,
        };
        let first = jsonwebtoken::encode(&header, &claims, &service.encoding).unwrap();
        let second = jsonwebtoken::encode(&header, &claims, &service.encoding).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn other_secrets_are_rejected() {
        let token = TokenService::new(b"someone else's secret", None)
            .issue(Id::new())
            .unwrap();
        assert_eq!(
            Err(InvalidToken::BadSignature),
            TokenService::new(SECRET, None).verify(&token)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let service = TokenService::new(SECRET, None);
        let token = service.issue(Id::new()).unwrap();
        let other = service.issue(Id::new()).unwrap();

        // Splice the second token's payload under the first token's signature.
        let parts = token.split('.').collect::<Vec<_>>();
        let other_parts = other.split('.').collect::<Vec<_>>();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(Err(InvalidToken::BadSignature), service.verify(&forged));
    }

    #[test]
    fn garbage_is_malformed() {
        let service = TokenService::new(SECRET, None);
        assert_eq!(Err(InvalidToken::Malformed), service.verify(""));
        assert_eq!(Err(InvalidToken::Malformed), service.verify("abc.def"));
        assert_eq!(Err(InvalidToken::Malformed), service.verify("not a token"));
    }

    #[test]
    fn subject_must_be_an_id() {
        let service = TokenService::new(SECRET, None);
        let claims = Claims {
            sub: "admin".to_string(),
            iat: Utc::now().timestamp(),
            exp: None,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &service.encoding)
                .unwrap();
        assert_eq!(Err(InvalidToken::BadSubject), service.verify(&token));
    }

    #[test]
    fn expiry_is_enforced_when_enabled() {
        let service = TokenService::new(SECRET, Some(Duration::hours(1)));
        let now = Utc::now();
        let claims = Claims {
            sub: Id::new().to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: Some((now - Duration::hours(1)).timestamp()),
        };
        let expired =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &service.encoding)
                .unwrap();
        assert_eq!(Err(InvalidToken::Expired), service.verify(&expired));

        let fresh = service.issue(Id::new()).unwrap();
        assert!(service.verify(&fresh).is_ok());
    }

    #[test]
    fn expiry_is_required_when_enabled() {
        let without_expiry = TokenService::new(SECRET, None).issue(Id::new()).unwrap();
        let service = TokenService::new(SECRET, Some(Duration::hours(1)));
        assert_eq!(Err(InvalidToken::Malformed), service.verify(&without_expiry));
    }
}
