//! Parameter and secret-reference parsing.
//!
//! Pure functions over the raw flag values; mutual exclusion between
//! `--param` and `--params-json` is enforced by the caller.

use std::collections::BTreeMap;

use catalog_client::{Parameters, SecretKeyRef};
use serde_json::Value;

use crate::error::ParamError;

/// Provisioning parameters: name → JSON value.
pub type ParameterSet = Parameters;

/// Secret-backed parameters: parameter name → secret reference.
pub type SecretReferenceSet = BTreeMap<String, SecretKeyRef>;

/// Parse `NAME=VALUE` tokens into a parameter set.
///
/// Each token is split on its first `=`; name and value are trimmed and the
/// value is kept as a plain string. A repeated name silently overwrites the
/// earlier value.
pub fn parse_variable_assignments<S: AsRef<str>>(tokens: &[S]) -> Result<ParameterSet, ParamError> {
    let mut params = ParameterSet::new();
    for token in tokens {
        let token = token.as_ref();
        let Some((name, value)) = token.split_once('=') else {
            return Err(malformed_assignment(token));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed_assignment(token));
        }
        params.insert(name.to_string(), Value::String(value.trim().to_string()));
    }
    Ok(params)
}

/// Parse a JSON document whose top level is an object.
pub fn parse_variable_json(document: &str) -> Result<ParameterSet, ParamError> {
    match serde_json::from_str::<Value>(document) {
        Ok(Value::Object(params)) => Ok(params),
        _ => Err(ParamError::InvalidJson {
            document: document.to_string(),
        }),
    }
}

/// Parse `SECRET[KEY]` tokens into secret references keyed by secret name.
///
/// Both parts are trimmed and must be non-empty and free of brackets. A
/// repeated secret name silently overwrites the earlier reference.
pub fn parse_key_maps<S: AsRef<str>>(tokens: &[S]) -> Result<SecretReferenceSet, ParamError> {
    let mut secrets = SecretReferenceSet::new();
    for token in tokens {
        let token = token.as_ref();
        let (name, key) = split_key_map(token).ok_or_else(|| {
            ParamError::MalformedSecretReference {
                token: token.to_string(),
            }
        })?;
        secrets.insert(name.to_string(), SecretKeyRef::new(name, key));
    }
    Ok(secrets)
}

fn split_key_map(token: &str) -> Option<(&str, &str)> {
    let (name, key) = token.trim().strip_suffix(']')?.split_once('[')?;
    let (name, key) = (name.trim(), key.trim());
    let valid = |part: &str| !part.is_empty() && !part.contains(['[', ']']);
    (valid(name) && valid(key)).then_some((name, key))
}

fn malformed_assignment(token: &str) -> ParamError {
    ParamError::MalformedAssignment {
        token: token.to_string(),
    }
}
