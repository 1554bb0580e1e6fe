//! Parameter source selection and the validated provision request.

use catalog_client::ProvisionOptions;
use serde::Serialize;

use crate::error::{ProvisionError, ProvisionResult};
use crate::params::{
    parse_key_maps, parse_variable_assignments, parse_variable_json, ParameterSet,
    SecretReferenceSet,
};

/// Where provisioning parameters come from. `--param` and `--params-json`
/// are mutually exclusive, so exactly one source is ever parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// A single JSON object from `--params-json`.
    Json(String),
    /// Zero or more `NAME=VALUE` tokens from `--param`.
    Assignments(Vec<String>),
}

impl Default for ParamSource {
    fn default() -> Self {
        ParamSource::Assignments(Vec::new())
    }
}

impl ParamSource {
    /// Pick the source from raw flag values. An empty JSON string counts as absent.
    pub fn from_flags(json: Option<String>, assignments: Vec<String>) -> ProvisionResult<Self> {
        match json.filter(|doc| !doc.is_empty()) {
            Some(_) if !assignments.is_empty() => Err(ProvisionError::ConflictingParamSources),
            Some(doc) => Ok(ParamSource::Json(doc)),
            None => Ok(ParamSource::Assignments(assignments)),
        }
    }

    /// Flag name used in error messages.
    pub fn flag(&self) -> &'static str {
        match self {
            ParamSource::Json(_) => "--params-json",
            ParamSource::Assignments(_) => "--param",
        }
    }

    /// Parse the source into a parameter set.
    pub fn assemble(&self) -> ProvisionResult<ParameterSet> {
        let parsed = match self {
            ParamSource::Json(doc) => parse_variable_json(doc),
            ParamSource::Assignments(tokens) => parse_variable_assignments(tokens.as_slice()),
        };
        parsed.map_err(|source| ProvisionError::InvalidFlag {
            flag: self.flag(),
            source,
        })
    }
}

/// Parse `--secret` tokens, wrapping errors with the flag name.
pub fn assemble_secrets(tokens: &[String]) -> ProvisionResult<SecretReferenceSet> {
    parse_key_maps(tokens).map_err(|source| ProvisionError::InvalidFlag {
        flag: "--secret",
        source,
    })
}

/// Everything the resource manager needs to create one instance.
///
/// Built only by validation; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionRequest {
    instance_name: String,
    class_name: String,
    plan_name: String,
    external_id: Option<String>,
    namespace: String,
    params: ParameterSet,
    secrets: SecretReferenceSet,
}

impl ProvisionRequest {
    pub(crate) fn new(
        instance_name: String,
        class_name: String,
        plan_name: String,
        external_id: Option<String>,
        namespace: String,
        params: ParameterSet,
        secrets: SecretReferenceSet,
    ) -> Self {
        Self {
            instance_name,
            class_name,
            plan_name,
            external_id,
            namespace,
            params,
            secrets,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn plan_name(&self) -> &str {
        &self.plan_name
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn secrets(&self) -> &SecretReferenceSet {
        &self.secrets
    }

    /// Options payload for `ServiceCatalog::provision`.
    pub fn options(&self) -> ProvisionOptions {
        ProvisionOptions {
            external_id: self.external_id.clone(),
            namespace: self.namespace.clone(),
            params: self.params.clone(),
            secrets: self.secrets.clone(),
        }
    }
}
