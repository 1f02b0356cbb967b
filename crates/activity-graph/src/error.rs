//! Graph API error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GraphError {
    /// The resource does not exist. Everything else says nothing about existence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => "Resource not found".to_string(),
            Self::TokenExpired => "The Graph token has expired. Acquire a new one.".to_string(),
            Self::Forbidden(_) => "The app is missing permissions for this resource.".to_string(),
            Self::RateLimited(secs) => format!("Throttled by Graph. Wait {} seconds.", secs),
            Self::Api { status, .. } => format!("Graph request failed ({})", status),
            Self::InvalidResponse(_) => "Graph returned an unexpected response".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(GraphError::NotFound("x".into()).is_not_found());
        assert!(!GraphError::TokenExpired.is_not_found());
        assert!(!GraphError::Api {
            status: 500,
            message: String::new()
        }
        .is_not_found());
    }

    #[test]
    fn test_is_retryable() {
        assert!(GraphError::RateLimited(10).is_retryable());
        assert!(GraphError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!GraphError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!GraphError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_user_messages() {
        assert!(GraphError::RateLimited(30).user_message().contains("30"));
        assert!(GraphError::TokenExpired.user_message().contains("expired"));
    }
}
