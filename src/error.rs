//! Error types shared by the store, provider, synchronizer and service layers.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A violated invariant on a rate record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} '{code}' is not a 3-letter uppercase currency code")]
    InvalidCurrency { field: &'static str, code: String },

    #[error("currencies of a rate must differ, got {0} twice")]
    SameCurrency(String),

    #[error("rate value must be a non-negative number, got {0}")]
    InvalidValue(f64),

    #[error("last update time {at} is in the future (now: {now})")]
    FutureTimestamp {
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("one or more required parameters are missing")]
    MissingParameters,

    #[error("parameter 'value' is wrong: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("rate for {first}-{second} already exists")]
    Duplicate { first: String, second: String },

    #[error("exchange provider request failed: {0}")]
    Provider(String),

    #[error("malformed exchange provider response: {0}")]
    Decode(String),

    #[error("currency {target} not found in provider rates for {base}")]
    MissingQuote { base: String, target: String },

    #[error("store failure: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// JSON body returned to API clients on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    /// HTTP status an API layer should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingParameters => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Duplicate { .. } => StatusCode::CONFLICT,
            Error::InvalidAmount(_)
            | Error::Validation(_)
            | Error::Provider(_)
            | Error::Decode(_)
            | Error::MissingQuote { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}
