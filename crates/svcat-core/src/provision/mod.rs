//! Provision: turn raw flag values into one request and execute it.
//!
//! # Modules
//!
//! - [`request`] — `ParamSource` selection + immutable `ProvisionRequest`
//! - [`command`] — `ProvisionArgs::validate()` → `ValidatedProvision::run()`

pub mod command;
pub mod request;

pub use command::{ProvisionArgs, ValidatedProvision, DEFAULT_NAMESPACE, WAITING_MESSAGE};
pub use request::{assemble_secrets, ParamSource, ProvisionRequest};
