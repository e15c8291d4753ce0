//! Command-line entry point.
//!
//! `collect` runs the full snapshot collection against a management API
//! server; `get-token` exchanges basic-auth credentials for the API token
//! the collect command needs.

use clap::{Args, Parser, Subcommand};
use infrasnap_api::{auth, ApiClient, HttpTransport};
use infrasnap_core::config::{OutputFormat, ProtocolCredentials, RunConfig};
use infrasnap_inventory::enrich::ProtocolEnricher;
use infrasnap_inventory::snapshot::FileSnapshotWriter;
use infrasnap_protocol::SessionConnector;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "infrasnap", version, about = "Point-in-time inventory snapshots of a virtualized datacenter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect provider and VM snapshots
    Collect(CollectArgs),
    /// Obtain an API token with basic-auth credentials
    GetToken(GetTokenArgs),
}

#[derive(Args)]
struct CollectArgs {
    /// Management API server hostname or IP
    #[arg(long, default_value = "localhost")]
    server: String,

    /// API authentication token
    #[arg(long)]
    token: String,

    /// Provider display name, required when several providers match
    #[arg(long)]
    name: Option<String>,

    /// Provider type filter
    #[arg(long)]
    provider_type: Option<String>,

    /// Collect a single VM by display name
    #[arg(long)]
    vm: Option<String>,

    /// Hypervisor management username; enables protocol enrichment
    #[arg(long, requires = "password")]
    username: Option<String>,

    /// Hypervisor management password
    #[arg(long, requires = "username")]
    password: Option<String>,

    /// Base directory for snapshot files
    #[arg(long, default_value = "/tmp/migration_analytics")]
    output_dir: PathBuf,

    /// Snapshot format: json or json-pretty
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[derive(Args)]
struct GetTokenArgs {
    /// Management API server hostname or IP
    #[arg(long, default_value = "localhost")]
    server: String,

    #[arg(long, default_value = "admin")]
    username: String,

    #[arg(long, default_value = "smartvm")]
    password: String,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,
}

impl CollectArgs {
    fn into_config(self) -> RunConfig {
        let protocol = match (self.username, self.password) {
            (Some(username), Some(password)) => Some(ProtocolCredentials { username, password }),
            _ => None,
        };
        RunConfig {
            server: self.server,
            token: self.token,
            provider_name: self.name,
            provider_type: self.provider_type,
            vm_name: self.vm,
            output_dir: self.output_dir,
            format: self.format,
            insecure: self.insecure,
            timeout_secs: self.timeout_secs,
            protocol,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Collect(args) => collect(args.into_config()).await,
        Command::GetToken(args) => get_token(args).await,
    }
}

async fn collect(cfg: RunConfig) -> ExitCode {
    let transport = match HttpTransport::new(&cfg.token, cfg.insecure, cfg.timeout_secs) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let client = match ApiClient::new(&cfg.server, transport) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let enricher = match &cfg.protocol {
        Some(creds) => ProtocolEnricher::new(Box::new(SessionConnector::new(
            &creds.username,
            &creds.password,
            cfg.insecure,
            cfg.timeout_secs,
        ))),
        None => ProtocolEnricher::disabled(),
    };
    let writer = FileSnapshotWriter::new(cfg.output_dir.clone(), cfg.format);

    match infrasnap_inventory::run(&cfg, &client, enricher, &writer).await {
        Ok(summary) => {
            tracing::info!(
                "done: {} provider snapshot(s), {} VM snapshot(s) under {}",
                summary.providers_written,
                summary.vms_written,
                cfg.output_dir.display()
            );
            for (entity, reason) in &summary.failed {
                tracing::warn!("{entity}: {reason}");
            }
            if summary.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn get_token(args: GetTokenArgs) -> ExitCode {
    match auth::fetch_token(
        &args.server,
        &args.username,
        &args.password,
        args.insecure,
        30,
    )
    .await
    {
        Ok(token) => {
            println!("{token}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
