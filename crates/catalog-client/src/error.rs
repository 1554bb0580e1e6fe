//! Error types for catalog-client

use thiserror::Error;

/// Errors returned by a service catalog backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Instance does not exist in the namespace
    #[error("instance not found: {namespace}/{name}")]
    InstanceNotFound { namespace: String, name: String },

    /// An instance with the same name already exists
    #[error("instance already exists: {namespace}/{name}")]
    AlreadyExists { namespace: String, name: String },

    /// Class could not be resolved
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// Plan could not be resolved for the class
    #[error("plan {plan} not found for class {class}")]
    PlanNotFound { class: String, plan: String },

    /// Resource manager answered with a non-success status
    #[error("resource manager returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("decode failed: {0}")]
    Decode(String),

    /// Client configuration is incomplete
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_instance() {
        let err = CatalogError::InstanceNotFound {
            namespace: "default".to_string(),
            name: "mysql1234".to_string(),
        };
        assert_eq!(err.to_string(), "instance not found: default/mysql1234");
    }

    #[test]
    fn test_api_error_display() {
        let err = CatalogError::Api {
            status: 503,
            message: "broker unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("broker unavailable"));
    }
}
