//! GitHub App Authentication
//!
//! Loads the App's RSA private key and signs the short-lived JWT used to
//! authenticate as the App.

use crate::error::IssueError;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Lifetime of an App JWT (GitHub allows at most 10 minutes)
pub const JWT_LIFETIME_SECS: i64 = 600;

/// Where the private key PEM comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// PEM text given inline
    Inline(String),
    /// Path to a PEM file
    File(PathBuf),
    /// Base64 encoded PEM text
    Base64(String),
}

impl KeySource {
    /// Read and decode the PEM bytes
    fn load(&self) -> Result<Vec<u8>, IssueError> {
        let bytes = match self {
            KeySource::Inline(pem) => pem.as_bytes().to_vec(),
            KeySource::File(path) => fs::read(path).map_err(|e| {
                IssueError::KeyMaterial(format!(
                    "failed to read pem_file '{}': {}",
                    path.display(),
                    e
                ))
            })?,
            KeySource::Base64(encoded) => {
                // `base64` wraps its output every 76 columns
                let joined: String = encoded
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                base64::engine::general_purpose::STANDARD
                    .decode(joined)
                    .map_err(|e| {
                        IssueError::KeyMaterial(format!("failed to decode pem_b64: {e}"))
                    })?
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(IssueError::KeyMaterial("unable to parse pem: key is empty".into()));
        }

        Ok(bytes)
    }
}

/// RSA private key of the GitHub App, parsed once
pub struct SigningKey {
    key: EncodingKey,
}

impl SigningKey {
    /// Load and parse the key from its source
    pub fn load(source: &KeySource) -> Result<Self, IssueError> {
        let pem = source.load()?;
        Self::from_pem(&pem)
    }

    /// Parse an RSA private key from PEM bytes (PKCS#1 or PKCS#8)
    pub fn from_pem(pem: &[u8]) -> Result<Self, IssueError> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| IssueError::KeyMaterial(format!("unable to parse pem: {e}")))?;
        Ok(Self { key })
    }

    /// Sign the claims with RS256
    pub fn sign(&self, claims: &AppClaims) -> Result<String, IssueError> {
        let header = Header::new(Algorithm::RS256);
        encode(&header, claims, &self.key).map_err(|e| IssueError::SigningFailed(e.to_string()))
    }
}

/// JWT claims for GitHub App authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer (Client ID or App ID)
    pub iss: String,
}

impl AppClaims {
    /// Build claims issued at `now` and valid for [`JWT_LIFETIME_SECS`]
    pub fn new(issuer: impl Into<String>, now: DateTime<Utc>) -> Self {
        let expires = now + Duration::seconds(JWT_LIFETIME_SECS);
        Self {
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iss: issuer.into(),
        }
    }
}

/// Generate a JWT for GitHub App authentication
///
/// # Arguments
/// * `issuer` - The GitHub App Client ID or App ID
/// * `key` - The App's parsed private key
/// * `now` - Issue time of the token
///
/// # Returns
/// A JWT string valid for 10 minutes after `now`
pub fn generate_jwt(
    issuer: &str,
    key: &SigningKey,
    now: DateTime<Utc>,
) -> Result<String, IssueError> {
    let claims = AppClaims::new(issuer, now);
    debug!(iss = %claims.iss, iat = claims.iat, exp = claims.exp, "Signing App JWT");
    key.sign(&claims)
}
