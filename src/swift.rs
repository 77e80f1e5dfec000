//! Swift storage session.
//!
//! [`SwiftSession`] holds one authenticated connection to a Swift endpoint and
//! exposes the account/container primitives the provisioning flow needs, so
//! callers never touch the raw connection:
//!
//! ```ignore
//! let session = SwiftSession::from_credentials(&auth_url, &user, &key).await?;
//! session.create_container("a1b2c3", headers).await?;
//! ```
//!
//! The connection itself sits behind [`StorageConnection`], mirroring the
//! verbs of the storage API (`post_account`, `get_account`, `put_container`,
//! `post_container`, `head_container`), with [`HttpStorageConnection`] as the
//! live implementation.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::keystone::IdentitySession;

/// Container metadata header carrying the CORS allow-origin value.
const CORS_HEADER: &str = "X-Container-Meta-Access-Control-Allow-Origin";

/// Request/response headers as name-value pairs.
pub type Headers = Vec<(String, String)>;

/// One container descriptor from an account listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub bytes: u64,
}

/// The verbs of the storage API an authenticated connection offers.
#[async_trait]
pub trait StorageConnection: Send + Sync {
    async fn post_account(&self, headers: Headers) -> Result<()>;
    async fn get_account(&self) -> Result<Vec<ContainerInfo>>;
    async fn put_container(&self, name: &str, headers: Headers) -> Result<()>;
    async fn post_container(&self, name: &str, headers: Headers) -> Result<()>;
    async fn head_container(&self, name: &str) -> Result<Headers>;
}

/// Pre-authenticated HTTP connection to a Swift storage URL.
pub struct HttpStorageConnection {
    client: Client,
    storage_url: String,
    token: String,
}

impl HttpStorageConnection {
    /// Connect to a storage URL with an already-issued token.
    pub fn preauth(storage_url: &str, token: &str) -> Result<Self> {
        Self::build(storage_url, token, false)
    }

    /// Same as [`preauth`](Self::preauth), with certificate verification
    /// disabled. Used by the token-reuse path, which talks to the catalog's
    /// admin endpoint.
    pub fn preauth_insecure(storage_url: &str, token: &str) -> Result<Self> {
        Self::build(storage_url, token, true)
    }

    fn build(storage_url: &str, token: &str, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| {
                Error::AuthenticationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Exchange credentials for a storage URL/token pair.
    ///
    /// GET on the auth endpoint with `X-Auth-User`/`X-Auth-Key`; the response
    /// headers carry `X-Storage-Url` and `X-Auth-Token`.
    pub async fn get_auth(auth_url: &str, user: &str, key: &str) -> Result<(String, String)> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                Error::AuthenticationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        debug!("Exchanging credentials at {}", auth_url);

        let response = client
            .get(auth_url)
            .header("X-Auth-User", user)
            .header("X-Auth-Key", key)
            .send()
            .await
            .map_err(|e| Error::AuthenticationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AuthenticationFailed(format!(
                "Auth endpoint returned {}",
                status
            )));
        }

        let storage_url = header_value(response.headers(), "X-Storage-Url")
            .ok_or_else(|| Error::AuthenticationFailed("Auth response missing X-Storage-Url".to_string()))?;
        let token = header_value(response.headers(), "X-Auth-Token")
            .ok_or_else(|| Error::AuthenticationFailed("Auth response missing X-Auth-Token".to_string()))?;

        Ok((storage_url, token))
    }

    fn container_url(&self, name: &str) -> String {
        format!("{}/{}", self.storage_url, urlencoding::encode(name))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header("X-Auth-Token", self.token.as_str())
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::StorageRequestFailed {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl StorageConnection for HttpStorageConnection {
    async fn post_account(&self, headers: Headers) -> Result<()> {
        let request = apply_headers(self.client.post(&self.storage_url), &headers);
        self.send(request).await.map(|_| ())
    }

    async fn get_account(&self) -> Result<Vec<ContainerInfo>> {
        let url = format!("{}?format=json", self.storage_url);
        let response = self.send(self.client.get(&url)).await?;
        response.json().await.map_err(request_failed)
    }

    async fn put_container(&self, name: &str, headers: Headers) -> Result<()> {
        let request = apply_headers(self.client.put(self.container_url(name)), &headers);
        self.send(request).await.map(|_| ())
    }

    async fn post_container(&self, name: &str, headers: Headers) -> Result<()> {
        let request = apply_headers(self.client.post(self.container_url(name)), &headers);
        self.send(request).await.map(|_| ())
    }

    async fn head_container(&self, name: &str) -> Result<Headers> {
        let response = self.send(self.client.head(self.container_url(name))).await?;
        Ok(response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect())
    }
}

fn apply_headers(mut request: RequestBuilder, headers: &Headers) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

fn request_failed(e: reqwest::Error) -> Error {
    Error::StorageRequestFailed {
        status: e.status().map_or(0, |s| s.as_u16()),
        reason: e.to_string(),
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Authenticated storage session exposing account/container operations.
pub struct SwiftSession {
    conn: Box<dyn StorageConnection>,
}

impl SwiftSession {
    /// Reuse an identity session: read its token, resolve the object-store
    /// admin endpoint, and connect pre-authenticated (certificate
    /// verification disabled on this path).
    pub fn from_identity_session(identity: &dyn IdentitySession) -> Result<Self> {
        let token = identity.auth_token().to_string();
        let endpoints = identity.storage_endpoints()?;
        let conn = HttpStorageConnection::preauth_insecure(&endpoints.admin_url, &token)?;
        Ok(Self { conn: Box::new(conn) })
    }

    /// Exchange credentials at the auth endpoint, then connect
    /// pre-authenticated with the returned URL/token pair.
    pub async fn from_credentials(auth_url: &str, user: &str, key: &str) -> Result<Self> {
        let (storage_url, token) = HttpStorageConnection::get_auth(auth_url, user, key).await?;
        let conn = HttpStorageConnection::preauth(&storage_url, &token)?;
        Ok(Self { conn: Box::new(conn) })
    }

    /// Wrap an existing connection.
    pub fn with_connection(conn: Box<dyn StorageConnection>) -> Self {
        Self { conn }
    }

    /// Apply account-level metadata headers (quota, enabling flags).
    pub async fn create_account(&self, headers: Headers) -> Result<()> {
        self.conn.post_account(headers).await
    }

    /// Mark the account's subject for removal.
    ///
    /// Only sets the removal metadata header; what removal means is up to the
    /// storage backend.
    pub async fn remove_account(&self, subject: &str) -> Result<()> {
        self.conn
            .post_account(vec![(
                "X-Remove-Account-Meta-Subject".to_string(),
                subject.to_string(),
            )])
            .await
    }

    /// Containers of the account bound at construction, in listing order.
    pub async fn account_containers(&self) -> Result<Vec<ContainerInfo>> {
        self.conn.get_account().await
    }

    /// Create a container, or update its metadata if it already exists.
    pub async fn create_container(&self, name: &str, headers: Headers) -> Result<()> {
        self.conn.put_container(name, headers).await
    }

    /// Post removal-signal headers to a container (same caveat as
    /// [`remove_account`](Self::remove_account)).
    pub async fn remove_container(&self, name: &str, headers: Headers) -> Result<()> {
        self.conn.post_container(name, headers).await
    }

    /// The container's CORS allow-origin value, `""` when absent.
    pub async fn get_cors(&self, container: &str) -> Result<String> {
        let headers = self.conn.head_container(container).await?;
        Ok(headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CORS_HEADER))
            .map(|(_, value)| value.clone())
            .unwrap_or_default())
    }

    /// Set the CORS allow-origin value. With `append`, `url` is concatenated
    /// onto the existing value space-separated; otherwise it replaces it.
    pub async fn set_cors(&self, container: &str, url: &str, append: bool) -> Result<()> {
        let value = if append {
            let existing = self.get_cors(container).await?;
            format!("{} {}", existing, url).trim().to_string()
        } else {
            url.to_string()
        };

        self.conn
            .post_container(container, vec![(CORS_HEADER.to_string(), value)])
            .await
    }

    /// Remove `url` from the CORS allow-origin value.
    ///
    /// Literal substring removal, not a token-aware set difference: a `url`
    /// that overlaps another entry corrupts that entry. Callers must pass the
    /// exact stored token.
    pub async fn unset_cors(&self, container: &str, url: &str) -> Result<()> {
        let existing = self.get_cors(container).await?;
        let remaining = existing.replace(url, "").trim().to_string();

        self.conn
            .post_container(container, vec![(CORS_HEADER.to_string(), remaining)])
            .await
    }
}
