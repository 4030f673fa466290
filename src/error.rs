//! Errors surfaced by the group and expense services.
//!
//! - [`NotFound`] the referenced group or expense does not exist.
//! - [`Unauthorized`] the caller lacks the membership, ownership or payer
//!   relationship the operation requires, or presented no valid identity.
//! - [`BadRequest`] required input is missing or malformed.
//! - [`Store`] the document store itself failed.
//!
//!  [`NotFound`]: SplitError::NotFound
//!  [`Unauthorized`]: SplitError::Unauthorized
//!  [`BadRequest`]: SplitError::BadRequest
//!  [`Store`]: SplitError::Store
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error("could not encode document: {0}")]
    Serialize(#[from] bson::ser::Error),
    #[error("could not decode document: {0}")]
    Deserialize(#[from] bson::de::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SplitResult<T> = Result<T, SplitError>;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ResponseError for SplitError {
    fn status_code(&self) -> StatusCode {
        match self {
            SplitError::NotFound(_) => StatusCode::NOT_FOUND,
            SplitError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SplitError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SplitError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            SplitError::Store(err) => {
                tracing::error!("store error: {err}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SplitError::NotFound("Group not found".to_string()), StatusCode::NOT_FOUND)]
    #[case(SplitError::Unauthorized("nope".to_string()), StatusCode::UNAUTHORIZED)]
    #[case(SplitError::BadRequest("bad".to_string()), StatusCode::BAD_REQUEST)]
    fn domain_errors_map_to_status(#[case] err: SplitError, #[case] status: StatusCode) {
        assert_eq!(err.error_response().status(), status);
    }

    #[test]
    fn store_errors_hide_details() {
        let decode = bson::from_document::<crate::schemas::User>(bson::doc! {}).unwrap_err();
        let err = SplitError::from(StoreError::from(decode));
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
