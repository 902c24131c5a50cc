use serde::Serialize;

use crate::pipeline::OrderError;

/// Body of every non-success reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl From<&OrderError> for ErrorBody {
    fn from(err: &OrderError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code(),
        }
    }
}

/// Response of an inbound operation: a status class plus a serializable body.
///
/// Serializes as just the body; the status class travels out of band through
/// [`Reply::status_code`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Created(T),
    Ok(T),
    BadRequest(ErrorBody),
    NotFound(ErrorBody),
    Failed(ErrorBody),
}

impl<T> Reply<T> {
    pub fn status_code(&self) -> u16 {
        match self {
            Reply::Created(_) => 201,
            Reply::Ok(_) => 200,
            Reply::BadRequest(_) => 400,
            Reply::NotFound(_) => 404,
            Reply::Failed(_) => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Created(_) | Reply::Ok(_))
    }

    /// The success body, if any.
    pub fn into_body(self) -> Option<T> {
        match self {
            Reply::Created(body) | Reply::Ok(body) => Some(body),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Reply::BadRequest(body) | Reply::NotFound(body) | Reply::Failed(body) => Some(body),
            _ => None,
        }
    }

    /// Maps a pipeline error to its status class.
    pub fn from_error(err: &OrderError) -> Self {
        let body = ErrorBody::from(err);
        match err {
            OrderError::InvalidAmount(_) => Reply::BadRequest(body),
            OrderError::NotFound(_) => Reply::NotFound(body),
            OrderError::PaymentDeclined | OrderError::StepFailed { .. } | OrderError::Store(_) => {
                Reply::Failed(body)
            }
        }
    }
}
