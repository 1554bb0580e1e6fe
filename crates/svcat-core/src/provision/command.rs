//! The provision command: validate once, execute once.
//!
//! [`ProvisionArgs`] holds the raw flag values. [`ProvisionArgs::validate`]
//! consumes them and returns a [`ValidatedProvision`], and
//! [`ValidatedProvision::run`] consumes that in turn, so a command can be
//! neither validated nor executed twice:
//!
//! ```compile_fail
//! use svcat_core::ProvisionArgs;
//!
//! let args = ProvisionArgs::new("mysqldb", "free");
//! let validated = args.validate(&["bananainstance"]).unwrap();
//! let again = args.validate(&["bananainstance"]);
//! ```

use std::io::Write;

use catalog_client::{ServiceCatalog, ServiceInstance};
use tracing::instrument;

use super::request::{assemble_secrets, ParamSource, ProvisionRequest};
use crate::error::{ProvisionError, ProvisionResult};
use crate::obs::{emit_provision_accepted, emit_provision_requested};
use crate::report::{write_report, ReportFormat};
use crate::wait::{cancelled, wait_for_instance, CancelSignal, PollConfig};

/// Status line printed when wait mode begins.
pub const WAITING_MESSAGE: &str = "Waiting for the instance to be provisioned...";

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Raw, unvalidated inputs of `svcat provision`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionArgs {
    pub class_name: String,
    pub plan_name: String,
    pub external_id: Option<String>,
    pub namespace: String,
    /// `--param` tokens
    pub raw_params: Vec<String>,
    /// `--params-json` document
    pub json_params: Option<String>,
    /// `--secret` tokens
    pub raw_secrets: Vec<String>,
    /// `Some` when `--wait` was given
    pub wait: Option<PollConfig>,
    pub output: ReportFormat,
}

impl ProvisionArgs {
    pub fn new(class_name: impl Into<String>, plan_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            plan_name: plan_name.into(),
            external_id: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            raw_params: Vec::new(),
            json_params: None,
            raw_secrets: Vec::new(),
            wait: None,
            output: ReportFormat::default(),
        }
    }

    /// Check positional arguments and parse every parameter source.
    ///
    /// The first positional argument is the instance name; any further ones
    /// are ignored. Nothing here talks to the resource manager.
    pub fn validate<S: AsRef<str>>(self, args: &[S]) -> ProvisionResult<ValidatedProvision> {
        let instance_name = args
            .first()
            .map(|name| name.as_ref().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(ProvisionError::MissingInstanceName)?;

        let source = ParamSource::from_flags(self.json_params, self.raw_params)?;
        let params = source.assemble()?;
        let secrets = assemble_secrets(&self.raw_secrets)?;

        if let Some(config) = &self.wait {
            config.validate()?;
        }

        let external_id = self.external_id.filter(|id| !id.is_empty());
        Ok(ValidatedProvision {
            request: ProvisionRequest::new(
                instance_name,
                self.class_name,
                self.plan_name,
                external_id,
                self.namespace,
                params,
                secrets,
            ),
            wait: self.wait,
            output: self.output,
        })
    }
}

/// A provision command that passed validation and has not run yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProvision {
    request: ProvisionRequest,
    wait: Option<PollConfig>,
    output: ReportFormat,
}

impl ValidatedProvision {
    pub fn request(&self) -> &ProvisionRequest {
        &self.request
    }

    pub fn wait(&self) -> Option<&PollConfig> {
        self.wait.as_ref()
    }

    /// Provision the instance and, in wait mode, poll until it settles.
    ///
    /// A failed or cancelled provision call returns immediately without
    /// polling or writing a report. Otherwise the best-known snapshot is always written
    /// to `out`, even when polling times out, fails or is cancelled; the poll
    /// error is returned afterwards.
    #[instrument(
        name = "svcat.provision",
        skip_all,
        fields(namespace = %self.request.namespace(), instance = %self.request.instance_name())
    )]
    pub async fn run(
        self,
        client: &dyn ServiceCatalog,
        out: &mut dyn Write,
        mut cancel: CancelSignal,
    ) -> ProvisionResult<ServiceInstance> {
        let request = self.request;
        emit_provision_requested(
            request.class_name(),
            request.plan_name(),
            request.params().len(),
            request.secrets().len(),
        );
        let options = request.options();
        let instance = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                return Err(ProvisionError::ProvisionCancelled {
                    namespace: request.namespace().to_string(),
                    name: request.instance_name().to_string(),
                });
            }
            result = client.provision(
                request.instance_name(),
                request.class_name(),
                request.plan_name(),
                &options,
            ) => result.map_err(ProvisionError::ProvisionFailed)?,
        };
        emit_provision_accepted(&instance.namespace, &instance.name, &instance.status_summary());

        let Some(config) = self.wait else {
            write_report(out, self.output, &instance)?;
            return Ok(instance);
        };

        writeln!(out, "{}", WAITING_MESSAGE)?;
        let outcome =
            wait_for_instance(client, &instance.namespace, &instance.name, &config, cancel).await?;
        let (latest, result) = outcome.into_parts(&instance.namespace, &instance.name, &config);
        let best = latest.unwrap_or(instance);

        write_report(out, self.output, &best)?;
        result.map(|()| best)
    }
}
