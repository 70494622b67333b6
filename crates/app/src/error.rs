//! HTTP mapping for service errors.
//!
//! Every failure leaves the API as `{"error": "<message>"}`. Storage and
//! crypto failures are logged here and reported without detail.

use std::error::Error as StdError;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::{AccountServiceError, AuthError, ContentError, QuizError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn bad_request(err: &impl ToString) -> Self {
        Self::BadRequest(err.to_string())
    }

    fn not_found(err: &impl ToString) -> Self {
        Self::NotFound(err.to_string())
    }

    fn internal(err: &(dyn StdError + 'static)) -> Self {
        tracing::error!(error = err, "request failed");
        Self::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Unwraps a required body field, mirroring the 400 the client expects.
pub(crate) fn required<T>(value: Option<T>, message: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// Like [`required`], but blank strings count as missing.
pub(crate) fn required_text(value: Option<String>, message: &str) -> Result<String, ApiError> {
    required(value.filter(|v| !v.trim().is_empty()), message)
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::StudentNotFound
            | QuizError::ModuleNotFound
            | QuizError::SessionNotFound
            | QuizError::QuestionNotFound
            | QuizError::AnswerNotFound => Self::not_found(&err),
            QuizError::SessionEnded
            | QuizError::AlreadyEnded
            | QuizError::AlreadyAnswered
            | QuizError::InvalidAnswer(_) => Self::bad_request(&err),
            _ => Self::internal(&err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken => {
                Self::Unauthorized(err.to_string())
            }
            _ => Self::internal(&err),
        }
    }
}

impl From<AccountServiceError> for ApiError {
    fn from(err: AccountServiceError) -> Self {
        match err {
            AccountServiceError::Validation(_) | AccountServiceError::UsernameTaken => {
                Self::bad_request(&err)
            }
            AccountServiceError::InvalidCredentials(message) => {
                Self::Unauthorized(message.to_string())
            }
            AccountServiceError::StudentNotFound => Self::not_found(&err),
            AccountServiceError::Auth(auth) => auth.into(),
            _ => Self::internal(&err),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Question(_) | ContentError::Puzzle(_) | ContentError::QuestionInUse => {
                Self::bad_request(&err)
            }
            ContentError::ConceptNotFound
            | ContentError::QuestionNotFound
            | ContentError::PuzzleNotFound
            | ContentError::StudentNotFound
            | ContentError::NoPuzzle(_) => Self::not_found(&err),
            _ => Self::internal(&err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
