//! Error types for the inspection gateway

use hyper::StatusCode;

/// Main error type for inspection operations
#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InspectionError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

impl From<std::io::Error> for InspectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for InspectionError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {}", err))
    }
}

/// Result type alias for inspection operations
pub type Result<T> = std::result::Result<T, InspectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            InspectionError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            InspectionError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            InspectionError::Persistence("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_body_is_bare_message_for_client_errors() {
        let (status, body) = InspectionError::NotFound("Item not found".into()).into_status_code_and_body();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Item not found");
    }

    #[test]
    fn test_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        assert!(matches!(InspectionError::from(io), InspectionError::Internal(_)));

        let json = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = InspectionError::from(json);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
