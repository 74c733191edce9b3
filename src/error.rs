use actix::MailboxError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::store::DuplicateUrl;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Conflict(DuplicateUrl),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<DuplicateUrl>() {
            Ok(duplicate) => Error::Conflict(duplicate),
            Err(error) => Error::Internal(error),
        }
    }
}

impl From<MailboxError> for Error {
    fn from(error: MailboxError) -> Self {
        Error::Internal(anyhow::anyhow!("redis executor unavailable: {}", error))
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Error::Internal(error) = self {
            error!("Internal error: {:#}", error);
        }

        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
