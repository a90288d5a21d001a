use chrono::{DateTime, Utc};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::policy::Denial;

pub type Result<T> = std::result::Result<T, Error>;

/// The request-level error taxonomy.
///
/// Policy denials keep the family that blocked the request; internal
/// failures (DB, serialisation, JWT) surface as a bare 500 with the detail
/// only in the log, never in the response.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSer(#[from] mongodb::bson::ser::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden ({family}): {reason}")]
    Forbidden { family: &'static str, reason: String },
    #[error("Account locked until {0}")]
    Locked(DateTime<Utc>),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation: {0}")]
    Validation(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<Denial> for Error {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Missing(what) => Self::NotFound(what),
            other => Self::Forbidden {
                family: other.family(),
                reason: other.reason().to_string(),
            },
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        Err(match self {
            Self::Db(ref err) => {
                error!("Database failure: {err}");
                Status::InternalServerError
            }
            Self::BsonSer(ref err) => {
                error!("Serialisation failure: {err}");
                Status::InternalServerError
            }
            Self::Jwt(err) => {
                warn!("Rejected token: {err}");
                Status::Unauthorized
            }
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden { family, ref reason } => {
                info!("Denied by {family}: {reason}");
                Status::Forbidden
            }
            Self::Locked(_) => Status::Locked,
            Self::Conflict(_) => Status::Conflict,
            Self::Validation(_) => Status::BadRequest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_conversion_keeps_the_family() {
        let err: Error = Denial::Mac("classified".to_string()).into();
        match err {
            Error::Forbidden { family, reason } => {
                assert_eq!(family, "MAC");
                assert_eq!(reason, "classified");
            }
            other => panic!("expected Forbidden, got {:?}", other),
        }

        let err: Error = Denial::Missing("election".to_string()).into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
