//! Plugin configuration
//!
//! Every option can be given as a long flag or as the `PLUGIN_*` environment
//! variable a pipeline step sets. Empty values count as unset.

use crate::error::IssueError;
use crate::github::DEFAULT_API_URL;
use crate::output::Destinations;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

/// Issue GitHub App JWTs and installation tokens
#[derive(Parser, Debug, Default)]
#[command(name = "github-app-token")]
#[command(about = "Issue GitHub App JWTs and scoped installation access tokens")]
#[command(version)]
pub struct Args {
    /// GitHub App ID
    #[arg(long, env = "PLUGIN_APP_ID")]
    pub app_id: Option<String>,

    /// GitHub App Client ID (preferred over the App ID)
    #[arg(long, env = "PLUGIN_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Private key in PEM format
    #[arg(long, env = "PLUGIN_PEM", hide_env_values = true)]
    pub pem: Option<String>,

    /// Path to the private key PEM file
    #[arg(long, env = "PLUGIN_PEM_FILE")]
    pub pem_file: Option<String>,

    /// Base64 encoded private key PEM
    #[arg(long, env = "PLUGIN_PEM_B64", hide_env_values = true)]
    pub pem_b64: Option<String>,

    /// Installation ID to issue an access token for
    #[arg(long, env = "PLUGIN_INSTALLATION")]
    pub installation: Option<String>,

    /// Comma-separated repository IDs to scope the token to
    #[arg(long, env = "PLUGIN_REPO_IDS")]
    pub repo_ids: Option<String>,

    /// Comma-separated repository names (without owner) to scope the token to
    #[arg(long, env = "PLUGIN_REPO_NAMES")]
    pub repo_names: Option<String>,

    /// File with repository IDs, one per line or comma-separated
    #[arg(long, env = "PLUGIN_REPO_IDS_FILE")]
    pub repo_ids_file: Option<String>,

    /// Token permissions, e.g. "contents:read,issues:write"
    #[arg(long, env = "PLUGIN_PERMISSIONS")]
    pub permissions: Option<String>,

    /// Write the JWT to this file
    #[arg(long, env = "PLUGIN_JWT_FILE")]
    pub jwt_file: Option<String>,

    /// Write the installation token to this file
    #[arg(long, env = "PLUGIN_TOKEN_FILE")]
    pub token_file: Option<String>,

    /// Write the JSON output to this file
    #[arg(long, env = "PLUGIN_JSON_FILE")]
    pub json_file: Option<String>,

    /// Store the JWT in this secret
    #[arg(long, env = "PLUGIN_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Store the installation token in this secret
    #[arg(long, env = "PLUGIN_TOKEN_SECRET")]
    pub token_secret: Option<String>,

    /// Store the JSON output in this secret
    #[arg(long, env = "PLUGIN_JSON_SECRET")]
    pub json_secret: Option<String>,

    /// Secret manager that owns the secrets (GCP project ID)
    #[arg(long, env = "PLUGIN_SECRET_MANAGER")]
    pub secret_manager: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "PLUGIN_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Log filter (e.g. "info", "debug")
    #[arg(long, env = "PLUGIN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Raw credential options handed to the issuer
///
/// Values are already normalised: blank strings are `None`.
#[derive(Debug, Clone, Default)]
pub struct IssueRequest {
    pub app_id: Option<String>,
    pub client_id: Option<String>,
    pub pem: Option<String>,
    pub pem_file: Option<PathBuf>,
    pub pem_b64: Option<String>,
    pub installation: Option<String>,
    pub repo_ids: Option<String>,
    pub repo_names: Option<String>,
    pub repo_ids_file: Option<PathBuf>,
    pub permissions: Option<String>,
}

impl Args {
    /// Split the arguments into the issuer request and the output destinations
    pub fn into_parts(self) -> (IssueRequest, Destinations) {
        let request = IssueRequest {
            app_id: trimmed(self.app_id),
            client_id: trimmed(self.client_id),
            pem: non_blank(self.pem),
            pem_file: trimmed(self.pem_file).map(PathBuf::from),
            pem_b64: trimmed(self.pem_b64),
            installation: trimmed(self.installation),
            repo_ids: non_blank(self.repo_ids),
            repo_names: non_blank(self.repo_names),
            repo_ids_file: trimmed(self.repo_ids_file).map(PathBuf::from),
            permissions: non_blank(self.permissions),
        };

        let destinations = Destinations {
            jwt_file: trimmed(self.jwt_file).map(PathBuf::from),
            token_file: trimmed(self.token_file).map(PathBuf::from),
            json_file: trimmed(self.json_file).map(PathBuf::from),
            jwt_secret: trimmed(self.jwt_secret),
            token_secret: trimmed(self.token_secret),
            json_secret: trimmed(self.json_secret),
            secret_manager: trimmed(self.secret_manager),
        };

        (request, destinations)
    }
}

/// Map a failed parse to a configuration error
///
/// Returns `None` for help and version requests, which clap reports through
/// the error path but are not failures.
pub fn usage_error(err: &clap::Error) -> Option<IssueError> {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => None,
        _ => Some(IssueError::Config(err.kind().to_string())),
    }
}

/// Keep the value untouched unless it is blank
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trim surrounding whitespace, dropping blank values
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
