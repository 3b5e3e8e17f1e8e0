// Error types for request handling

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code a host should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) | Error::Deserialization(_) => 400,
            Error::Forbidden(_) => 403,
            Error::Serialization(_) | Error::Internal(_) => 500,
        }
    }
}
