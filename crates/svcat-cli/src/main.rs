//! svcat - Service Catalog CLI
//!
//! The `svcat` command creates service instances on a resource manager.
//!
//! ## Commands
//!
//! - `provision`: Create a new instance of a service class and plan,
//!   optionally waiting until it is ready or has failed

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};

use catalog_client::{CatalogConfig, HttpCatalog, ServiceCatalog};
use svcat_core::{
    cancel_channel, CancelSignal, PollConfig, ProvisionArgs, ReportFormat, ValidatedProvision,
    DEFAULT_NAMESPACE,
};

#[derive(Parser)]
#[command(name = "svcat")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Service Catalog CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Base URL of the resource manager
    #[arg(long, global = true, env = "SVCAT_SERVER")]
    server: Option<String>,

    /// User-Agent header sent with every request
    #[arg(long, global = true, env = "SVCAT_USER_AGENT")]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new instance of a service
    ///
    /// Examples:
    ///   svcat provision wordpress-mysql-instance --class mysqldb --plan free -p location=eastus -p sslEnforcement=disabled
    ///   svcat provision wordpress-mysql-instance --external-id a7c00676-4398-11e8-842f-0ed5f89f718b --class mysqldb --plan free
    ///   svcat provision wordpress-mysql-instance --class mysqldb --plan free -s mysecret[dbparams]
    ///   svcat provision secure-instance --class mysqldb --plan secureDB --params-json '{"encrypt": true}'
    Provision(ProvisionCmd),
}

#[derive(Args, Debug)]
struct ProvisionCmd {
    /// Name of the new instance
    names: Vec<String>,

    /// The plan name (Required)
    #[arg(long)]
    plan: String,

    /// The class name (Required)
    #[arg(long)]
    class: String,

    /// The ID of the instance for use with the OSB SB API (Optional)
    #[arg(long)]
    external_id: Option<String>,

    /// Additional parameter to use when provisioning the service, format: NAME=VALUE. Repeatable or comma-separated (values cannot contain commas; use --params-json). Cannot be combined with --params-json
    #[arg(short = 'p', long = "param", value_delimiter = ',')]
    params: Vec<String>,

    /// Additional parameters to use when provisioning the service, provided as a JSON object. Cannot be combined with --param
    #[arg(long)]
    params_json: Option<String>,

    /// Additional parameter, whose value is stored in a secret, to use when provisioning the service, format: SECRET[KEY]. Repeatable or comma-separated
    #[arg(short = 's', long = "secret", value_delimiter = ',')]
    secrets: Vec<String>,

    /// Wait until the operation completes
    #[arg(long)]
    wait: bool,

    /// Poll interval for --wait, e.g. 500ms, 1s, 2m
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    interval: Duration,

    /// Timeout for --wait, e.g. 30s, 5m, 1h
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    timeout: Duration,

    /// Namespace to create the instance in
    #[arg(short, long, env = "SVCAT_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

impl ProvisionCmd {
    /// Split into the core command inputs and the positional arguments.
    fn into_args(self) -> (ProvisionArgs, Vec<String>) {
        let mut args = ProvisionArgs::new(self.class, self.plan);
        args.external_id = self.external_id;
        args.namespace = self.namespace;
        args.raw_params = self.params;
        args.json_params = self.params_json;
        args.raw_secrets = self.secrets;
        args.wait = self
            .wait
            .then(|| PollConfig::new(self.interval, self.timeout));
        args.output = self.output.into();
        (args, self.names)
    }
}

/// Parse a duration such as `250ms`, `10s`, `5m` or `1h`. A bare number is seconds.
fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    let seconds = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("invalid duration '{raw}': too large"))
    };
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => seconds(1),
        "m" => seconds(60),
        "h" => seconds(3600),
        other => Err(format!(
            "invalid duration unit '{other}' in '{raw}' (expected ms, s, m or h)"
        )),
    }
}

fn build_client(server: Option<String>, user_agent: Option<String>) -> Result<HttpCatalog> {
    let server = server.context("No resource manager configured; pass --server or set SVCAT_SERVER")?;
    let mut config = CatalogConfig::new(server);
    if let Some(user_agent) = user_agent.filter(|ua| !ua.is_empty()) {
        config.user_agent = user_agent;
    }
    HttpCatalog::new(config).context("Failed to build resource manager client")
}

/// Flip the cancel signal on Ctrl+C. Both the provision call and the wait
/// observe the signal, so an interrupt always ends the command.
fn spawn_interrupt_listener() -> CancelSignal {
    let (tx, cancel) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            let _ = tx.send(true);
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    svcat_core::init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Provision(cmd) => {
            let (args, names) = cmd.into_args();
            let validated = args.validate(&names)?;
            let client = build_client(cli.server, cli.user_agent)?;
            let cancel = spawn_interrupt_listener();
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            cmd_provision(&client, validated, &mut out, cancel).await
        }
    }
}

async fn cmd_provision(
    client: &dyn ServiceCatalog,
    validated: ValidatedProvision,
    out: &mut dyn Write,
    cancel: CancelSignal,
) -> Result<()> {
    let namespace = validated.request().namespace().to_string();
    let name = validated.request().instance_name().to_string();
    validated
        .run(client, out, cancel)
        .await
        .with_context(|| format!("Failed to provision instance {}/{}", namespace, name))?;
    out.flush()?;
    Ok(())
}
