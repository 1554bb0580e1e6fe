//! Client trait definitions for the service catalog
//!
//! `ServiceCatalog` is the only seam between svcat and the resource manager:
//! - `provision`: request a new instance of a class/plan
//! - `retrieve_instance`: fetch the current state of an instance
//!
//! Whether an instance has settled is decided here, by the snapshot itself
//! (`ServiceInstance::is_terminal`), so callers only react to terminal vs not.
//! An in-memory fake is provided for testing via the `fakes` module.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Result type for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Free-form provisioning parameters keyed by name.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Provision inputs
// ---------------------------------------------------------------------------

/// Pointer to a value stored in a secret. Only the reference travels; the
/// resource manager resolves the value itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Key inside the secret
    pub key: String,
}

impl SecretKeyRef {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for SecretKeyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.name, self.key)
    }
}

/// Optional settings attached to a provision request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionOptions {
    /// ID used with the broker API; the resource manager picks one when absent
    pub external_id: Option<String>,
    /// Namespace the instance is created in
    pub namespace: String,
    /// Provisioning parameters
    pub params: Parameters,
    /// Parameters whose values live in secrets
    pub secrets: BTreeMap<String, SecretKeyRef>,
}

// ---------------------------------------------------------------------------
// Instance snapshot
// ---------------------------------------------------------------------------

/// Kind of status condition reported on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Ready,
    Failed,
}

/// Tri-state status of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A single status condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

/// Point-in-time view of a service instance as reported by the resource manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub uid: Option<String>,
    pub class_name: String,
    pub plan_name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretKeyRef>,
    #[serde(default)]
    pub conditions: Vec<InstanceCondition>,
}

impl ServiceInstance {
    /// Create a snapshot with no parameters and no conditions.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        class_name: impl Into<String>,
        plan_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: None,
            class_name: class_name.into(),
            plan_name: plan_name.into(),
            external_id: None,
            parameters: Parameters::new(),
            secrets: BTreeMap::new(),
            conditions: Vec::new(),
        }
    }

    /// Look up a condition by type.
    pub fn condition(&self, condition_type: ConditionType) -> Option<&InstanceCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Insert or replace the condition of the given type.
    pub fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        let condition = InstanceCondition {
            condition_type,
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        };
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    /// `Ready` condition is `True`.
    pub fn is_ready(&self) -> bool {
        self.condition_is_true(ConditionType::Ready)
    }

    /// `Failed` condition is `True`.
    pub fn is_failed(&self) -> bool {
        self.condition_is_true(ConditionType::Failed)
    }

    /// The resource manager will not move this instance any further on its own.
    pub fn is_terminal(&self) -> bool {
        self.is_ready() || self.is_failed()
    }

    /// Human-readable status: the reason of the most relevant condition.
    pub fn status_summary(&self) -> String {
        let relevant = if self.is_failed() {
            self.condition(ConditionType::Failed)
        } else {
            self.condition(ConditionType::Ready)
        };
        match relevant {
            Some(c) if c.message.is_empty() => c.reason.clone(),
            Some(c) => format!("{} - {}", c.reason, c.message),
            None => "Pending".to_string(),
        }
    }

    fn condition_is_true(&self, condition_type: ConditionType) -> bool {
        self.condition(condition_type)
            .map(|c| c.status == ConditionStatus::True)
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// ServiceCatalog
// ---------------------------------------------------------------------------

/// Resource-manager client used by svcat.
///
/// Guarantees:
/// - `provision` returns the instance as accepted by the resource manager;
///   the instance is usually not terminal yet.
/// - `retrieve_instance` returns `CatalogError::InstanceNotFound` if absent.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Request creation of a new instance.
    async fn provision(
        &self,
        instance_name: &str,
        class_name: &str,
        plan_name: &str,
        options: &ProvisionOptions,
    ) -> CatalogResult<ServiceInstance>;

    /// Fetch the current state of an instance.
    async fn retrieve_instance(&self, namespace: &str, name: &str)
        -> CatalogResult<ServiceInstance>;
}
