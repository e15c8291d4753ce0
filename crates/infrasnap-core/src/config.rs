//! Run configuration for a single collection run.
//!
//! One immutable value built up front (from the CLI or a test fixture) and
//! handed to every component by reference — there is no ambient shared state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Serialization format for snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Json,
    JsonPretty,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "json-pretty" | "json_pretty" => Ok(Self::JsonPretty),
            other => Err(format!("unknown output format '{other}' (expected 'json' or 'json-pretty')")),
        }
    }
}

/// Credentials for the optional hypervisor management-protocol session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolCredentials {
    pub username: String,
    pub password: String,
}

/// Top-level configuration for one collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Management API server hostname / IP
    #[serde(default = "default_server")]
    pub server: String,
    /// API authentication token (sent as `x-auth-token`)
    pub token: String,
    /// Provider display name, required when more than one provider matches
    #[serde(default)]
    pub provider_name: Option<String>,
    /// Provider type filter (e.g. a vendor-specific type string); when
    /// absent, all providers are candidates
    #[serde(default)]
    pub provider_type: Option<String>,
    /// Restrict the VM pass to a single VM by display name
    #[serde(default)]
    pub vm_name: Option<String>,
    /// Base directory for snapshot files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Snapshot serialization format
    #[serde(default)]
    pub format: OutputFormat,
    /// Skip TLS certificate verification (self-signed labs)
    #[serde(default)]
    pub insecure: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Hypervisor management-protocol credentials; `None` disables enrichment
    #[serde(default)]
    pub protocol: Option<ProtocolCredentials>,
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp/migration_analytics")
}

fn default_timeout() -> u64 {
    30
}

impl RunConfig {
    /// Minimal config for a given server + token; everything else default.
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            token: token.into(),
            provider_name: None,
            provider_type: None,
            vm_name: None,
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
            insecure: false,
            timeout_secs: default_timeout(),
            protocol: None,
        }
    }
}
