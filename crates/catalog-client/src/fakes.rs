//! In-memory fake for the `ServiceCatalog` trait (testing only)
//!
//! `ScriptedCatalog` accepts provision requests into a `HashMap` and plays
//! back a scripted sequence of statuses on `retrieve_instance`, recording
//! every call so tests can assert on how the catalog was driven.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client_traits::*;
use crate::error::CatalogError;

/// Status applied to an instance on one `retrieve_instance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStatus {
    /// Still provisioning (`Ready=False`)
    Pending,
    /// Provisioned (`Ready=True`)
    Ready,
    /// Provisioning failed (`Failed=True`)
    Failed,
    /// The status query itself fails
    Error(CatalogError),
}

/// A recorded `provision` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionCall {
    pub instance_name: String,
    pub class_name: String,
    pub plan_name: String,
    pub options: ProvisionOptions,
}

/// In-memory catalog with scripted instance status transitions.
///
/// Once the script is exhausted the instance keeps its last state.
#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    instances: Mutex<HashMap<(String, String), ServiceInstance>>,
    script: Mutex<VecDeque<ScriptedStatus>>,
    provision_failure: Mutex<Option<CatalogError>>,
    provision_calls: Mutex<Vec<ProvisionCall>>,
    retrieve_calls: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog whose status queries play back `statuses` in order.
    pub fn with_statuses(statuses: impl IntoIterator<Item = ScriptedStatus>) -> Self {
        let catalog = Self::default();
        catalog.script.lock().unwrap().extend(statuses);
        catalog
    }

    /// Make every subsequent `provision` call fail with `err`.
    pub fn fail_provision(&self, err: CatalogError) {
        *self.provision_failure.lock().unwrap() = Some(err);
    }

    /// Seed an existing instance.
    pub fn insert_instance(&self, instance: ServiceInstance) {
        let key = (instance.namespace.clone(), instance.name.clone());
        self.instances.lock().unwrap().insert(key, instance);
    }

    pub fn provision_calls(&self) -> Vec<ProvisionCall> {
        self.provision_calls.lock().unwrap().clone()
    }

    pub fn provision_call_count(&self) -> usize {
        self.provision_calls.lock().unwrap().len()
    }

    pub fn retrieve_call_count(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceCatalog for ScriptedCatalog {
    async fn provision(
        &self,
        instance_name: &str,
        class_name: &str,
        plan_name: &str,
        options: &ProvisionOptions,
    ) -> CatalogResult<ServiceInstance> {
        self.provision_calls.lock().unwrap().push(ProvisionCall {
            instance_name: instance_name.to_string(),
            class_name: class_name.to_string(),
            plan_name: plan_name.to_string(),
            options: options.clone(),
        });

        if let Some(err) = self.provision_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let key = (options.namespace.clone(), instance_name.to_string());
        let mut instances = self.instances.lock().unwrap();
        if instances.contains_key(&key) {
            return Err(CatalogError::AlreadyExists {
                namespace: key.0,
                name: key.1,
            });
        }

        let mut instance =
            ServiceInstance::new(&options.namespace, instance_name, class_name, plan_name);
        instance.uid = Some(uuid::Uuid::new_v4().to_string());
        instance.external_id = options.external_id.clone();
        instance.parameters = options.params.clone();
        instance.secrets = options.secrets.clone();
        instance.set_condition(
            ConditionType::Ready,
            ConditionStatus::False,
            "Provisioning",
            "The instance is being provisioned asynchronously",
        );
        instances.insert(key, instance.clone());
        Ok(instance)
    }

    async fn retrieve_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> CatalogResult<ServiceInstance> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);

        let mut instances = self.instances.lock().unwrap();
        let instance = instances
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| CatalogError::InstanceNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        match self.script.lock().unwrap().pop_front() {
            Some(ScriptedStatus::Pending) => instance.set_condition(
                ConditionType::Ready,
                ConditionStatus::False,
                "Provisioning",
                "The instance is being provisioned asynchronously",
            ),
            Some(ScriptedStatus::Ready) => instance.set_condition(
                ConditionType::Ready,
                ConditionStatus::True,
                "ProvisionedSuccessfully",
                "The instance was provisioned successfully",
            ),
            Some(ScriptedStatus::Failed) => instance.set_condition(
                ConditionType::Failed,
                ConditionStatus::True,
                "ProvisionCallFailed",
                "Provision call failed",
            ),
            Some(ScriptedStatus::Error(err)) => return Err(err),
            None => {}
        }

        Ok(instance.clone())
    }
}
