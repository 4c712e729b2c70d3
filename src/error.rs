// src/error.rs
use std::fmt;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;

/// Failures talking to the remote REST backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("backend rejected the session token")]
    Unauthorized,

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected payload from backend: {0}")]
    Decode(String),

    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

/// Reasons a trade cannot be planned against the current holdings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("share count must be positive, got {0}")]
    InvalidShares(i64),

    #[error("price must be a positive number, got {0}")]
    InvalidPrice(f64),

    #[error("no holding for {0}")]
    NotHeld(String),

    #[error("cannot sell {requested} shares of {symbol}, only {owned} held")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        owned: i64,
    },

    #[error("holding {0} has no store id")]
    MissingId(String),

    #[error("no price available for {0}")]
    NoPrice(String),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("{0} is not in the portfolio")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Rejection carried through warp filters to the recover handler.
#[derive(Debug)]
pub struct CustomError {
    pub status: StatusCode,
    pub message: String,
}

impl CustomError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        CustomError {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CustomError {}

impl Reject for CustomError {}

impl From<ServiceError> for CustomError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Api(ApiError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ServiceError::Api(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Trade(TradeError::NotHeld(_)) | ServiceError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Trade(_) | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        CustomError::new(status, err.to_string())
    }
}
