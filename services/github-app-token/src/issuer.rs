//! Credential issuance
//!
//! Drives a single run: check the options, sign the App JWT, confirm GitHub
//! accepts it, then optionally exchange it for an installation token.
//! Option checks happen before any network call.

use crate::auth::{generate_jwt, KeySource, SigningKey};
use crate::config::IssueRequest;
use crate::error::IssueError;
use crate::exclusive::{choose, Choice};
use crate::github::{AccessToken, GitHubClient};
use crate::output::OutputBundle;
use crate::scope::{build_permissions, build_selector, RepositorySource, TokenRequest};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Issues JWTs and installation tokens against one GitHub API
pub struct CredentialIssuer {
    github: GitHubClient,
}

impl CredentialIssuer {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    /// Run the full issuance sequence with `now` as the JWT issue time
    pub async fn issue(
        &self,
        request: &IssueRequest,
        now: DateTime<Utc>,
    ) -> Result<OutputBundle, IssueError> {
        let issuer = resolve_issuer(request)?;
        let selection = resolve_selection(request)?;
        let key = SigningKey::load(&resolve_key_source(request)?)?;

        let jwt = generate_jwt(issuer, &key, now)?;

        let app = self.github.validate_identity(&jwt).await?;
        info!(app_id = app.id, slug = %app.slug, "Authenticated as {}", app.slug);

        let token = match &request.installation {
            Some(installation) => {
                let token = self
                    .installation_token(&jwt, installation, selection.as_ref(), request)
                    .await?;
                Some(token)
            }
            None => {
                warn!("No installation specified, issuing JWT only");
                None
            }
        };

        Ok(OutputBundle::new(jwt, token))
    }

    async fn installation_token(
        &self,
        jwt: &str,
        installation: &str,
        selection: Option<&RepositorySource>,
        request: &IssueRequest,
    ) -> Result<AccessToken, IssueError> {
        let repositories = match selection {
            Some(source) => build_selector(source)?,
            None => None,
        };
        let permissions = match &request.permissions {
            Some(spec) => build_permissions(spec)?,
            None => None,
        };
        let body = TokenRequest::new(repositories, permissions);

        info!(
            installation = %installation,
            scoped = body.is_some(),
            "Exchanging JWT for installation token"
        );

        let token = self
            .github
            .exchange_token(jwt, installation, body.as_ref())
            .await?;

        info!(
            expires_at = %token.expires_at,
            repositories = token.repositories.len(),
            "Token received"
        );
        for repo in &token.repositories {
            info!("  - {} (ID: {})", repo.name, repo.id);
        }
        if !token.permissions.is_empty() {
            let granted: Vec<String> = token
                .permissions
                .iter()
                .map(|(resource, level)| format!("{resource}:{level}"))
                .collect();
            info!(permissions = %granted.join(","), "Token permissions");
        }

        Ok(token)
    }
}

/// The JWT issuer: the Client ID when given, else the App ID
fn resolve_issuer(request: &IssueRequest) -> Result<&str, IssueError> {
    match choose([
        ("app_id", request.app_id.as_deref()),
        ("client_id", request.client_id.as_deref()),
    ]) {
        Choice::One { value, .. } => Ok(value),
        Choice::Absent => Err(IssueError::MissingIdentity),
        Choice::Conflict(_) => Err(IssueError::AmbiguousIdentity),
    }
}

/// At most one repository selection option, and only with an installation
fn resolve_selection(request: &IssueRequest) -> Result<Option<RepositorySource>, IssueError> {
    let source = match choose([
        ("repo_ids", request.repo_ids.clone().map(RepositorySource::Ids)),
        ("repo_names", request.repo_names.clone().map(RepositorySource::Names)),
        ("repo_ids_file", request.repo_ids_file.clone().map(RepositorySource::IdsFile)),
    ]) {
        Choice::Absent => return Ok(None),
        Choice::One { value, .. } => value,
        Choice::Conflict(options) => {
            return Err(IssueError::InvalidSelection(format!(
                "only one of repo_ids, repo_names, or repo_ids_file can be specified (got {})",
                options.join(", ")
            )));
        }
    };

    if request.installation.is_none() {
        return Err(IssueError::InvalidSelection(
            "installation must be specified when using repository selection".to_string(),
        ));
    }

    Ok(Some(source))
}

/// Exactly one private key source
fn resolve_key_source(request: &IssueRequest) -> Result<KeySource, IssueError> {
    match choose([
        ("pem", request.pem.clone().map(KeySource::Inline)),
        ("pem_file", request.pem_file.clone().map(KeySource::File)),
        ("pem_b64", request.pem_b64.clone().map(KeySource::Base64)),
    ]) {
        Choice::One { value, .. } => Ok(value),
        Choice::Absent => Err(IssueError::KeyMaterial(
            "one of pem, pem_file, or pem_b64 must be set".to_string(),
        )),
        Choice::Conflict(options) => Err(IssueError::KeyMaterial(format!(
            "only one of pem, pem_file, or pem_b64 can be set (got {})",
            options.join(", ")
        ))),
    }
}
