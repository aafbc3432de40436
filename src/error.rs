use thiserror::Error;

/// Main error type for Proxmox API operations
#[derive(Debug, Error)]
pub enum PmxError {
    /// Required credential fields missing or invalid
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    /// Login attempt did not yield usable session data
    #[error("cannot login using the provided credentials")]
    Authentication,

    /// Caller passed a bad argument; raised before any network activity
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl PmxError {
    /// Create a malformed-credentials error naming the offending field
    pub fn malformed(field: &str) -> Self {
        PmxError::MalformedCredentials(format!("missing or empty field '{}'", field))
    }

    /// Check if this error is a credential validation failure
    pub fn is_malformed_credentials(&self) -> bool {
        matches!(self, PmxError::MalformedCredentials(_))
    }

    /// Check if this error is a login failure
    pub fn is_authentication(&self) -> bool {
        matches!(self, PmxError::Authentication)
    }
}

/// Result type for Proxmox API operations
pub type Result<T> = std::result::Result<T, PmxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_names_field() {
        let error = PmxError::malformed("hostname");
        assert!(error.is_malformed_credentials());
        assert!(error.to_string().contains("hostname"));
    }

    #[test]
    fn test_authentication_message() {
        let error = PmxError::Authentication;
        assert!(error.is_authentication());
        assert_eq!(
            error.to_string(),
            "cannot login using the provided credentials"
        );
    }
}
