//! GitHub App Token Issuer
//!
//! Signs a GitHub App JWT, validates it, optionally exchanges it for an
//! installation token and writes the results to files or secrets.
//!
//! ## Usage
//! ```bash
//! # JWT only
//! github-app-token --app-id 123456 --pem-file ./key.pem --jwt-file ./jwt
//!
//! # Scoped installation token
//! github-app-token \
//!   --client-id Iv1.0123456789abcdef \
//!   --pem-b64 "$APP_KEY_B64" \
//!   --installation 78901234 \
//!   --repo-ids 1296269,1296270 \
//!   --permissions contents:read \
//!   --token-file ./token
//!
//! # Store the token in GCP Secret Manager
//! PLUGIN_CLIENT_ID=Iv1.0123456789abcdef \
//! PLUGIN_PEM_FILE=./key.pem \
//! PLUGIN_INSTALLATION=78901234 \
//! PLUGIN_TOKEN_SECRET=github-token \
//! PLUGIN_SECRET_MANAGER=gcp-lornu-ai \
//! github-app-token
//! ```

use chrono::Utc;
use clap::Parser;
use github_app_token::config::usage_error;
use github_app_token::output::{publish_secrets, write_files};
use github_app_token::{Args, CredentialIssuer, GitHubClient, GsmSecretStore, IssueError};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => match usage_error(&err) {
            Some(usage) => {
                let _ = err.print();
                return ExitCode::from(usage.exit_code());
            }
            None => err.exit(),
        },
    };

    // Logs go to stderr so stdout stays clean for the pipeline
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(exit_code = err.exit_code(), "{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), IssueError> {
    let github = GitHubClient::new(&args.api_url)?;
    let (request, destinations) = args.into_parts();
    destinations.validate()?;

    let issuer = CredentialIssuer::new(github);
    let bundle = issuer.issue(&request, Utc::now()).await?;

    write_files(&bundle, &destinations)?;

    if destinations.wants_secrets() {
        let store = GsmSecretStore::new()
            .await
            .map_err(|e| IssueError::OutputWrite(format!("{:#}", e)))?;
        publish_secrets(&bundle, &destinations, &store).await?;
    }

    info!("✅ Credentials issued");
    Ok(())
}
