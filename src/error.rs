use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::error;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::mongodb::errors::{duplicate_key_field, is_unavailable};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing, malformed, or expired credentials.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    /// Authenticated, but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// An identifier that is not in the store's format.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    /// A well-formed identifier with no matching record.
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("User has already voted")]
    AlreadyVoted,
    /// A unique field collided with an existing record.
    #[error("{0} already exists")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Db(DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The stable, machine-readable name of this error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidReference(_) => ErrorKind::InvalidReference,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyVoted => ErrorKind::AlreadyVoted,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message shown to clients. Internal details are never exposed.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal Server Error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        if let Some(field) = duplicate_key_field(&err) {
            Self::Conflict(field)
        } else if is_unavailable(&err) {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::Db(err)
        }
    }
}

/// Error categories, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    InvalidReference,
    NotFound,
    AlreadyVoted,
    Conflict,
    StoreUnavailable,
    BadRequest,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> Status {
        match self {
            Self::Unauthenticated => Status::Unauthorized,
            Self::Forbidden => Status::Forbidden,
            Self::InvalidReference | Self::BadRequest => Status::BadRequest,
            Self::NotFound => Status::NotFound,
            Self::AlreadyVoted | Self::Conflict => Status::Conflict,
            Self::StoreUnavailable => Status::ServiceUnavailable,
            Self::Internal => Status::InternalServerError,
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.public_message(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let kind = self.kind();
        if kind == ErrorKind::Internal {
            error!("{self}");
        }
        Custom(kind.status(), Json(ErrorBody::from(&self))).respond_to(req)
    }
}
