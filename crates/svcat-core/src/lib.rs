//! svcat Core Library
//!
//! Everything behind `svcat provision` that is not flag parsing or HTTP:
//! parameter and secret assembly, request validation, the completion poller
//! and the instance report.

pub mod error;
pub mod obs;
pub mod params;
pub mod provision;
pub mod report;
pub mod telemetry;
pub mod wait;

pub use error::{ParamError, ProvisionError, ProvisionResult};
pub use params::{
    parse_key_maps, parse_variable_assignments, parse_variable_json, ParameterSet,
    SecretReferenceSet,
};
pub use provision::{
    ParamSource, ProvisionArgs, ProvisionRequest, ValidatedProvision, DEFAULT_NAMESPACE,
    WAITING_MESSAGE,
};
pub use report::{write_instance_details, write_instance_json, write_report, ReportFormat};
pub use telemetry::init_tracing;
pub use wait::{cancel_channel, wait_for_instance, CancelSignal, PollConfig, PollOutcome};

/// svcat version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
