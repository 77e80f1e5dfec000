//! Keystone identity session.
//!
//! Authenticates once against a Keystone v2.0 endpoint and keeps the issued
//! token together with the object-store entries of the service catalog. The
//! storage session's token-reuse factory consumes this through the
//! [`IdentitySession`] trait, so tests and alternative identity backends can
//! stand in for a live Keystone.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Object-store endpoint URLs from the service catalog.
#[derive(Debug, Clone)]
pub struct StorageEndpoints {
    pub admin_url: String,
    pub public_url: Option<String>,
    pub internal_url: Option<String>,
}

/// An authenticated identity session the storage session can reuse.
///
/// Accessors are plain reads; a session never re-authenticates after login.
pub trait IdentitySession: Send + Sync {
    /// The auth token issued at login.
    fn auth_token(&self) -> &str;

    /// The object-store endpoints from the session's service catalog.
    fn storage_endpoints(&self) -> Result<StorageEndpoints>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(rename = "adminURL")]
    admin_url: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: Option<String>,
    #[serde(rename = "internalURL")]
    internal_url: Option<String>,
}

/// A Keystone v2.0 session established with password credentials.
pub struct KeystoneSession {
    token: String,
    catalog: Vec<CatalogEntry>,
}

impl KeystoneSession {
    /// Authenticate with password credentials and keep the token and catalog.
    pub async fn login(
        auth_url: &str,
        username: &str,
        password: &str,
        tenant: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::AuthenticationFailed(format!("Failed to build HTTP client: {}", e)))?;

        let url = format!("{}/tokens", auth_url.trim_end_matches('/'));
        debug!("Authenticating against keystone: {}", url);

        let body = json!({
            "auth": {
                "passwordCredentials": { "username": username, "password": password },
                "tenantName": tenant,
            }
        });

        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AuthenticationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AuthenticationFailed(format!(
                "Keystone returned {}",
                status
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::AuthenticationFailed(format!("Failed to parse keystone response: {}", e)))?;

        debug!("Keystone authentication succeeded");

        Ok(Self {
            token: token_response.access.token.id,
            catalog: token_response.access.service_catalog,
        })
    }
}

impl IdentitySession for KeystoneSession {
    fn auth_token(&self) -> &str {
        &self.token
    }

    fn storage_endpoints(&self) -> Result<StorageEndpoints> {
        resolve_object_store(&self.catalog)
    }
}

/// Pick the object-store entry out of a service catalog.
fn resolve_object_store(catalog: &[CatalogEntry]) -> Result<StorageEndpoints> {
    let entry = catalog
        .iter()
        .find(|entry| entry.service_type == "object-store")
        .ok_or_else(|| {
            Error::AuthenticationFailed("Service catalog has no object-store entry".to_string())
        })?;

    let endpoint = entry.endpoints.first().ok_or_else(|| {
        Error::AuthenticationFailed("Object-store catalog entry has no endpoints".to_string())
    })?;

    let admin_url = endpoint.admin_url.clone().ok_or_else(|| {
        Error::AuthenticationFailed("Object-store endpoint has no adminURL".to_string())
    })?;

    Ok(StorageEndpoints {
        admin_url,
        public_url: endpoint.public_url.clone(),
        internal_url: endpoint.internal_url.clone(),
    })
}
