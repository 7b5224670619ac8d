//! GCP Secret Manager Write Operations
//!
//! Stores issued credentials in Google Secret Manager using Application
//! Default Credentials (ADC). No hardcoded credentials, authentication is
//! handled by:
//! - Local: `gcloud auth application-default login`
//! - GKE: Workload Identity
//! - CI runners: the attached service account

use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_sdk::google::cloud::secretmanager::v1::secret_manager_service_client::SecretManagerServiceClient;
use gcloud_sdk::google::cloud::secretmanager::v1::{
    replication, AddSecretVersionRequest, CreateSecretRequest, GetSecretRequest, Replication,
    Secret,
};
use gcloud_sdk::proto_ext::secretmanager::SecretPayload;
use gcloud_sdk::{GoogleApi, GoogleAuthMiddleware};
use std::collections::HashMap;
use tracing::{debug, info};

/// Destination for string secrets
///
/// `manager_id` selects the secret manager instance that owns the secret.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store `value` under `name`, returning the new version identifier
    async fn set_secret(&self, name: &str, value: &str, manager_id: &str) -> Result<String>;
}

/// Google Secret Manager backed [`SecretStore`]
///
/// The manager id is the GCP project ID.
pub struct GsmSecretStore {
    client: GoogleApi<SecretManagerServiceClient<GoogleAuthMiddleware>>,
}

impl GsmSecretStore {
    /// Create a new Secret Manager client
    ///
    /// Uses Application Default Credentials (ADC) for authentication.
    pub async fn new() -> Result<Self> {
        debug!("Initializing GSM writer client");

        let client = GoogleApi::from_function(
            SecretManagerServiceClient::new,
            "https://secretmanager.googleapis.com",
            None,
        )
        .await
        .context("Failed to initialize GSM client")?;

        Ok(Self { client })
    }

    /// Check if a secret exists
    async fn secret_exists(&self, project_id: &str, secret_name: &str) -> Result<bool> {
        let name = format!("projects/{}/secrets/{}", project_id, secret_name);
        let request = GetSecretRequest { name };

        match self.client.get().get_secret(request).await {
            Ok(_) => Ok(true),
            Err(status) => {
                let status_str = status.to_string();
                if status_str.contains("NOT_FOUND") || status_str.contains("not found") {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!("Failed to check secret: {}", status))
                }
            }
        }
    }

    /// Create a secret with automatic replication and no versions
    async fn create_secret(&self, project_id: &str, secret_name: &str) -> Result<()> {
        let parent = format!("projects/{}", project_id);

        let labels = HashMap::from([("managed-by".to_string(), "github-app-token".to_string())]);

        let request = CreateSecretRequest {
            parent,
            secret_id: secret_name.to_string(),
            secret: Some(Secret {
                name: String::new(),
                replication: Some(Replication {
                    replication: Some(replication::Replication::Automatic(
                        replication::Automatic {
                            customer_managed_encryption: None,
                        },
                    )),
                }),
                labels,
                ..Default::default()
            }),
        };

        self.client
            .get()
            .create_secret(request)
            .await
            .context("Failed to create secret")?;

        info!(secret = %secret_name, "Secret created");
        Ok(())
    }

    /// Add a new version to an existing secret
    async fn add_secret_version(
        &self,
        project_id: &str,
        secret_name: &str,
        payload: &[u8],
    ) -> Result<String> {
        let parent = format!("projects/{}/secrets/{}", project_id, secret_name);

        let request = AddSecretVersionRequest {
            parent,
            payload: Some(SecretPayload {
                data: payload.to_vec().into(),
                ..Default::default()
            }),
        };

        let response = self
            .client
            .get()
            .add_secret_version(request)
            .await
            .context("Failed to add secret version")?;

        // Full name is projects/*/secrets/*/versions/<version>
        let version = response
            .into_inner()
            .name
            .rsplit('/')
            .next()
            .unwrap_or("unknown")
            .to_string();

        Ok(version)
    }
}

#[async_trait]
impl SecretStore for GsmSecretStore {
    async fn set_secret(&self, name: &str, value: &str, manager_id: &str) -> Result<String> {
        validate_secret_name(name)?;

        if !self.secret_exists(manager_id, name).await? {
            self.create_secret(manager_id, name).await?;
        }

        let version = self
            .add_secret_version(manager_id, name, value.as_bytes())
            .await?;

        info!(
            secret = %name,
            project = %manager_id,
            version = %version,
            "Secret version added"
        );

        Ok(version)
    }
}

/// Secret IDs are 1-255 characters of letters, digits, hyphens or underscores
pub fn validate_secret_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > 255
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!(
            "Secret name must be 1-255 alphanumeric characters, hyphens, or underscores: {}",
            name
        );
    }
    Ok(())
}
