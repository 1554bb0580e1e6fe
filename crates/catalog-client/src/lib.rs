//! Catalog-Client: Resource-Manager Access for svcat
//!
//! This crate is the only place svcat talks to the control plane. It defines
//! the `ServiceCatalog` trait the command layer is written against, the
//! instance snapshot it returns, and two implementations.
//!
//! ## Key Components
//!
//! - `ServiceCatalog`: provision + retrieve-instance contract
//! - `ServiceInstance`: snapshot with status conditions and terminal detection
//! - `HttpCatalog`: REST implementation (reqwest)
//! - `fakes::ScriptedCatalog`: in-memory implementation for tests

pub mod client_traits;
mod error;
pub mod fakes;
mod http;

pub use client_traits::{
    CatalogResult, ConditionStatus, ConditionType, InstanceCondition, Parameters,
    ProvisionOptions, SecretKeyRef, ServiceCatalog, ServiceInstance,
};
pub use error::CatalogError;
pub use http::{CatalogConfig, HttpCatalog};
