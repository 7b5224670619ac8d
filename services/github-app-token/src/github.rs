//! GitHub REST API client
//!
//! The two calls the App JWT is used for: asking GitHub who the App is, and
//! exchanging the JWT for an installation access token.

use crate::error::IssueError;
use crate::scope::TokenRequest;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Public GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "github-app-token";
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// What GitHub returns when an App queries itself
#[derive(Debug, Clone, Deserialize)]
pub struct AppIdentity {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Which repositories an installation token can reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySelection {
    All,
    Selected,
}

/// Repository granted to an installation token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRepository {
    pub id: u64,
    pub name: String,
}

/// Response from GitHub installation token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_selection: Option<RepositorySelection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<TokenRepository>,
}

/// Client for the GitHub App endpoints
pub struct GitHubClient {
    http: Client,
    api_url: Url,
}

impl GitHubClient {
    /// Create a client for the given API base URL
    pub fn new(api_url: &str) -> Result<Self, IssueError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| IssueError::Config(format!("invalid API URL '{}': {}", api_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(IssueError::Config(format!("API URL '{}' cannot be a base", api_url)));
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IssueError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, api_url })
    }

    /// Confirm GitHub accepts the JWT by fetching the authenticated App
    pub async fn validate_identity(&self, jwt: &str) -> Result<AppIdentity, IssueError> {
        let url = self.endpoint(&["app"]);
        debug!(url = %url, "Validating App JWT");

        let response = self
            .http
            .get(url)
            .bearer_auth(jwt)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| IssueError::ValidationFailed(format!("request failed: {e}")))?;

        read_json(response).await.map_err(IssueError::ValidationFailed)
    }

    /// Exchange the JWT for an installation access token
    ///
    /// The request body is only sent when `request` is given; otherwise the
    /// token gets the installation's full repository access and permissions.
    pub async fn exchange_token(
        &self,
        jwt: &str,
        installation_id: &str,
        request: Option<&TokenRequest>,
    ) -> Result<AccessToken, IssueError> {
        let url = self.endpoint(&["app", "installations", installation_id, "access_tokens"]);
        debug!(url = %url, scoped = request.is_some(), "Requesting installation token");

        let mut builder = self
            .http
            .post(url)
            .bearer_auth(jwt)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(request) = request {
            builder = builder.json(request);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| IssueError::TokenExchangeFailed(format!("request failed: {e}")))?;

        read_json(response)
            .await
            .map_err(IssueError::TokenExchangeFailed)
    }

    /// Append path segments to the API base, encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Decode a successful JSON response, describing any failure
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("failed to read response body: {e}"))?;

    if !status.is_success() {
        return Err(format!("GitHub API error ({}): {}", status, body));
    }

    serde_json::from_str(&body).map_err(|e| format!("failed to parse response: {e}"))
}
