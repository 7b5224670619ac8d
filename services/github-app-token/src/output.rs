//! Output fan-out
//!
//! Writes the issued credentials to files and/or secrets. Every destination
//! is optional and independent of the others.

use crate::error::IssueError;
use crate::github::AccessToken;
use crate::secret_manager::SecretStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct OutputBundle {
    /// Installation token, absent when no installation was given
    pub token: Option<AccessToken>,
    /// Signed App JWT
    pub jwt: String,
    /// Number of repositories the token is restricted to
    pub repository_count: usize,
    /// Permissions granted to the token
    pub permissions: BTreeMap<String, String>,
}

impl OutputBundle {
    pub fn new(jwt: String, token: Option<AccessToken>) -> Self {
        let repository_count = token.as_ref().map_or(0, |t| t.repositories.len());
        let permissions = token
            .as_ref()
            .map(|t| t.permissions.clone())
            .unwrap_or_default();

        Self {
            token,
            jwt,
            repository_count,
            permissions,
        }
    }

    /// The installation token string, if one was issued
    pub fn token_value(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.token.as_str())
    }

    /// Pretty JSON document of the whole bundle
    pub fn to_json(&self) -> Result<String, IssueError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| IssueError::OutputWrite(format!("failed to serialize JSON output: {e}")))
    }
}

/// Where outputs go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destinations {
    pub jwt_file: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub json_file: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub token_secret: Option<String>,
    pub json_secret: Option<String>,
    /// Secret manager that owns the secrets
    pub secret_manager: Option<String>,
}

impl Destinations {
    /// Whether any secret output was requested
    pub fn wants_secrets(&self) -> bool {
        self.jwt_secret.is_some() || self.token_secret.is_some() || self.json_secret.is_some()
    }

    /// Reject secret outputs without a secret manager before anything is issued
    pub fn validate(&self) -> Result<(), IssueError> {
        if self.wants_secrets() && self.secret_manager.is_none() {
            return Err(IssueError::OutputWrite(
                "secret_manager must be set to store secrets".to_string(),
            ));
        }
        Ok(())
    }
}

/// Write the requested output files
pub fn write_files(bundle: &OutputBundle, destinations: &Destinations) -> Result<(), IssueError> {
    if let Some(path) = &destinations.jwt_file {
        write_private(path, &bundle.jwt)?;
        info!(path = %path.display(), "JWT written");
    }

    if let Some(path) = &destinations.token_file {
        match bundle.token_value() {
            Some(token) => {
                write_private(path, token)?;
                info!(path = %path.display(), "Token written");
            }
            None => warn!("Requested token_file but no installation specified, skipping"),
        }
    }

    if let Some(path) = &destinations.json_file {
        write_private(path, &bundle.to_json()?)?;
        info!(path = %path.display(), "JSON written");
    }

    Ok(())
}

/// Store the requested outputs in the secret store
pub async fn publish_secrets(
    bundle: &OutputBundle,
    destinations: &Destinations,
    store: &dyn SecretStore,
) -> Result<(), IssueError> {
    if !destinations.wants_secrets() {
        return Ok(());
    }

    destinations.validate()?;
    let manager = destinations.secret_manager.as_deref().unwrap_or_default();

    if let Some(name) = &destinations.jwt_secret {
        store_secret(store, name, &bundle.jwt, manager).await?;
        info!(secret = %name, "JWT saved");
    }

    if let Some(name) = &destinations.token_secret {
        match bundle.token_value() {
            Some(token) => {
                store_secret(store, name, token, manager).await?;
                info!(secret = %name, "Token saved");
            }
            None => warn!("Requested token_secret but no installation specified, skipping"),
        }
    }

    if let Some(name) = &destinations.json_secret {
        store_secret(store, name, &bundle.to_json()?, manager).await?;
        info!(secret = %name, "JSON saved");
    }

    Ok(())
}

async fn store_secret(
    store: &dyn SecretStore,
    name: &str,
    value: &str,
    manager: &str,
) -> Result<(), IssueError> {
    store
        .set_secret(name, value, manager)
        .await
        .map(|_| ())
        .map_err(|e| IssueError::OutputWrite(format!("secret '{}': {:#}", name, e)))
}

/// Write a file readable only by the owner
fn write_private(path: &Path, contents: &str) -> Result<(), IssueError> {
    let to_error =
        |e: std::io::Error| IssueError::OutputWrite(format!("{}: {}", path.display(), e));

    fs::write(path, contents).map_err(to_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(to_error)?;
    }

    Ok(())
}
