use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::ActionData;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a record with this {field} already exists")]
    UniqueViolation { field: &'static str },

    #[error("referenced record does not exist")]
    MissingRecord,

    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("no such user")]
    NoSuchUser,

    #[error("password does not match")]
    WrongPassword,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { field: "username" } => CredentialError::UsernameTaken,
            other => CredentialError::Store(other),
        }
    }
}

/// Result of a request handler that did not succeed. The `ResponseError`
/// impl is the boundary that turns each variant into its status code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request")]
    BadRequest(ActionData),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Store(err) => AppError::Storage(err),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());
        match self {
            AppError::BadRequest(data) => res.json(data),
            AppError::Unauthenticated => res.json(json!({
                "error": "You must be logged in to do that.",
                "login": "/login",
            })),
            AppError::NotFound(message) => res.json(json!({ "error": message })),
            AppError::Storage(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                res.json(json!({ "error": "Something unexpected went wrong. Sorry about that." }))
            }
        }
    }
}
