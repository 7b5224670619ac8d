//! Installation token scoping
//!
//! Builds the optional body of the access token request: a repository
//! selector and/or a permission set. When neither is given the token keeps
//! the installation's defaults and no body is sent.

use crate::error::IssueError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// GitHub accepts at most this many repositories per token
pub const MAX_REPOSITORIES: usize = 500;

/// Where the repository list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    /// Comma-separated repository IDs
    Ids(String),
    /// Comma-separated repository names, without owner
    Names(String),
    /// File of repository IDs, newline and/or comma delimited
    IdsFile(PathBuf),
}

/// Repositories an installation token is restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySelector {
    Ids(Vec<u64>),
    Names(Vec<String>),
}

impl RepositorySelector {
    pub fn len(&self) -> usize {
        match self {
            RepositorySelector::Ids(ids) => ids.len(),
            RepositorySelector::Names(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resource name to permission level, e.g. `contents -> read`
pub type PermissionSet = BTreeMap<String, String>;

/// Body of the installation access token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub repositories: Option<RepositorySelector>,
    pub permissions: Option<PermissionSet>,
}

impl TokenRequest {
    /// Combine the scoping options, returning `None` when there is nothing to scope
    pub fn new(
        repositories: Option<RepositorySelector>,
        permissions: Option<PermissionSet>,
    ) -> Option<Self> {
        if repositories.is_none() && permissions.is_none() {
            return None;
        }
        Some(Self {
            repositories,
            permissions,
        })
    }
}

impl Serialize for TokenRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.repositories {
            Some(RepositorySelector::Ids(ids)) => map.serialize_entry("repository_ids", ids)?,
            Some(RepositorySelector::Names(names)) => map.serialize_entry("repositories", names)?,
            None => {}
        }
        if let Some(permissions) = &self.permissions {
            map.serialize_entry("permissions", permissions)?;
        }
        map.end()
    }
}

/// Parse the repository selector from its source
///
/// Returns `Ok(None)` when the source holds no entries, leaving the token
/// scoped to the whole installation.
pub fn build_selector(source: &RepositorySource) -> Result<Option<RepositorySelector>, IssueError> {
    let text = match source {
        RepositorySource::Ids(csv) | RepositorySource::Names(csv) => csv.clone(),
        RepositorySource::IdsFile(path) => fs::read_to_string(path).map_err(|e| {
            IssueError::MalformedRepositorySpec(format!(
                "failed to read repo_ids_file '{}': {}",
                path.display(),
                e
            ))
        })?,
    };

    let items = split_entries(&text);

    if items.is_empty() {
        return Ok(None);
    }

    if items.len() > MAX_REPOSITORIES {
        return Err(IssueError::MalformedRepositorySpec(format!(
            "repository list cannot contain more than {} entries (got {})",
            MAX_REPOSITORIES,
            items.len()
        )));
    }

    let selector = match source {
        RepositorySource::Names(_) => {
            if let Some(name) = items.iter().find(|name| name.contains('/')) {
                return Err(IssueError::MalformedRepositorySpec(format!(
                    "repository name '{}' should not include owner, use just the repository name (e.g. 'hello-world' not 'owner/hello-world')",
                    name
                )));
            }
            RepositorySelector::Names(items.into_iter().map(str::to_string).collect())
        }
        RepositorySource::Ids(_) | RepositorySource::IdsFile(_) => {
            let ids = items
                .into_iter()
                .map(|item| {
                    item.parse::<u64>().map_err(|e| {
                        IssueError::MalformedRepositorySpec(format!(
                            "invalid repository ID '{}': {}",
                            item, e
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            RepositorySelector::Ids(ids)
        }
    };

    Ok(Some(selector))
}

/// Split on newlines then commas, trimming and dropping empty entries
fn split_entries(text: &str) -> Vec<&str> {
    text.lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse a `resource:permission` list such as `contents:read,issues:write`
///
/// A resource given twice keeps its last permission, so later entries can
/// override earlier ones.
pub fn build_permissions(spec: &str) -> Result<Option<PermissionSet>, IssueError> {
    if spec.trim().is_empty() {
        return Ok(None);
    }

    let mut permissions = PermissionSet::new();

    for item in spec.split(',') {
        let item = item.trim();
        let parts: Vec<&str> = item.split(':').map(str::trim).collect();

        match parts.as_slice() {
            [resource, permission] if !resource.is_empty() && !permission.is_empty() => {
                permissions.insert(resource.to_string(), permission.to_string());
            }
            _ => {
                return Err(IssueError::MalformedPermissionSpec(format!(
                    "invalid permission '{}': expected 'resource:permission'",
                    item
                )));
            }
        }
    }

    Ok(Some(permissions))
}
