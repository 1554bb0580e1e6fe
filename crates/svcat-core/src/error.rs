//! Error taxonomy for svcat.

use std::time::Duration;

use catalog_client::CatalogError;

/// Errors produced while parsing `--param`, `--params-json` and `--secret` input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("invalid parameter ({token}), must be in name=value format")]
    MalformedAssignment { token: String },

    #[error("invalid parameters ({document})")]
    InvalidJson { document: String },

    #[error("invalid parameter ({token}), must be in MAP[KEY] format")]
    MalformedSecretReference { token: String },
}

/// Errors produced by the provision command.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("an instance name is required")]
    MissingInstanceName,

    #[error("--params-json cannot be used with --param")]
    ConflictingParamSources,

    #[error("invalid {flag} value ({source})")]
    InvalidFlag {
        flag: &'static str,
        source: ParamError,
    },

    #[error("invalid poll configuration: {0}")]
    InvalidPollConfig(String),

    #[error("{0}")]
    ProvisionFailed(#[source] CatalogError),

    #[error("cancelled while provisioning instance {namespace}/{name}; the request may already have been accepted")]
    ProvisionCancelled { namespace: String, name: String },

    #[error("timed out after {timeout:?} waiting for instance {namespace}/{name}")]
    PollTimedOut {
        namespace: String,
        name: String,
        timeout: Duration,
    },

    #[error("cancelled while waiting for instance {namespace}/{name}")]
    PollCancelled { namespace: String, name: String },

    #[error("error polling instance {namespace}/{name}: {source}")]
    PollQueryFailed {
        namespace: String,
        name: String,
        source: CatalogError,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ProvisionError {
    /// `true` for errors raised before any call to the resource manager.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProvisionError::MissingInstanceName
                | ProvisionError::ConflictingParamSources
                | ProvisionError::InvalidFlag { .. }
                | ProvisionError::InvalidPollConfig(_)
        )
    }

    /// `true` for errors raised after the instance was accepted, while waiting.
    pub fn is_poll(&self) -> bool {
        matches!(
            self,
            ProvisionError::PollTimedOut { .. }
                | ProvisionError::PollCancelled { .. }
                | ProvisionError::PollQueryFailed { .. }
        )
    }
}

/// Result type for provision operations.
pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;
