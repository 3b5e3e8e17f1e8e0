use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Invalid CSRF token")]
    InvalidToken,

    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid CSRF configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CsrfError>;

impl From<CsrfError> for rampart_core::Error {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::InvalidToken => {
                rampart_core::Error::Forbidden("Invalid CSRF token".to_string())
            }
            CsrfError::MissingToken => {
                rampart_core::Error::Forbidden("Missing CSRF token".to_string())
            }
            other => rampart_core::Error::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_map_to_forbidden() {
        let err: rampart_core::Error = CsrfError::InvalidToken.into();
        assert_eq!(err.status_code(), 403);

        let err: rampart_core::Error = CsrfError::MissingToken.into();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_generation_failure_maps_to_internal() {
        let err: rampart_core::Error = CsrfError::GenerationFailed("no entropy".into()).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("no entropy"));
    }
}
