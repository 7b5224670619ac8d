//! GitHub App Token Issuer
//!
//! Issues GitHub App credentials from a CI pipeline step: a signed App JWT
//! and, when an installation is given, an installation access token that can
//! be restricted to specific repositories and permissions.
//!
//! ## Flow
//!
//! 1. Check the options (identity, key source, repository selection)
//! 2. Sign a 10 minute RS256 JWT with the App's private key
//! 3. Confirm GitHub accepts the JWT (`GET /app`)
//! 4. Optionally exchange it for an installation token
//!    (`POST /app/installations/{id}/access_tokens`)
//! 5. Write the JWT, token and a JSON summary to files and/or GCP Secret Manager
//!
//! ## Example Pipeline
//!
//! ```bash
//! PLUGIN_CLIENT_ID=Iv1.0123456789abcdef \
//! PLUGIN_PEM_FILE=/secrets/app.pem \
//! PLUGIN_INSTALLATION=78901234 \
//! PLUGIN_REPO_NAMES=api,web \
//! PLUGIN_PERMISSIONS=contents:read,pull_requests:write \
//! PLUGIN_TOKEN_FILE=/workspace/.github-token \
//! github-app-token
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod exclusive;
pub mod github;
pub mod issuer;
pub mod output;
pub mod scope;
pub mod secret_manager;

pub use config::{Args, IssueRequest};
pub use error::IssueError;
pub use github::GitHubClient;
pub use issuer::CredentialIssuer;
pub use output::{Destinations, OutputBundle};
pub use secret_manager::{GsmSecretStore, SecretStore};
