//! ACL API client.
//!
//! Thin wrapper over the network access-control API. One call submits one
//! TCP permit rule between a source and destination CIDR; the response is
//! handed back as status/body so the caller decides what a non-success
//! status means.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Layer-4 match options for a permit rule: comparison operator, port and
/// direction (`"dest"` or `"src"`).
#[derive(Debug, Clone)]
pub struct L4Opts {
    pub comparison: String,
    pub port: u16,
    pub direction: String,
}

impl L4Opts {
    pub fn new(comparison: &str, port: u16, direction: &str) -> Self {
        Self {
            comparison: comparison.to_string(),
            port,
            direction: direction.to_string(),
        }
    }

    /// The "equal, destination-port" match used for service reachability rules.
    pub fn eq_dest(port: u16) -> Self {
        Self::new("eq", port, "dest")
    }

    fn as_json(&self) -> serde_json::Value {
        let prefix = if self.direction == "src" { "src" } else { "dest" };
        let mut options = serde_json::Map::new();
        options.insert(format!("{}-port-start", prefix), json!(self.port.to_string()));
        options.insert(format!("{}-port-op", prefix), json!(self.comparison));
        serde_json::Value::Object(options)
    }
}

/// Raw outcome of an ACL API call.
#[derive(Debug, Clone)]
pub struct AclResponse {
    pub status_code: u16,
    pub content: String,
}

impl AclResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// The access-control API collaborator.
#[async_trait]
pub trait AclApi: Send + Sync {
    /// Submit one TCP permit rule from `source` to `dest` (both `/32` CIDRs).
    async fn add_tcp_permit_access(
        &self,
        desc: &str,
        source: &str,
        dest: &str,
        l4_opts: &L4Opts,
    ) -> Result<AclResponse>;
}

/// HTTP client for the ACL API, authenticated with basic auth.
pub struct AclApiClient {
    client: Client,
    user: String,
    pass: String,
    base_url: String,
}

impl AclApiClient {
    pub fn new(user: &str, pass: &str, base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user: user.to_string(),
            pass: pass.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AclApi for AclApiClient {
    async fn add_tcp_permit_access(
        &self,
        desc: &str,
        source: &str,
        dest: &str,
        l4_opts: &L4Opts,
    ) -> Result<AclResponse> {
        // The rule is keyed by its source CIDR, kept raw in the path.
        let url = format!("{}/api/ipv4/acl/{}", self.base_url, source);

        let body = json!({
            "kind": "object#acl",
            "rules": [{
                "action": "permit",
                "protocol": "tcp",
                "description": desc,
                "source": source,
                "destination": dest,
                "l4-options": l4_opts.as_json(),
            }]
        });

        debug!("Submitting permit rule: {} -> {}", source, dest);

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AccessRuleRequestFailed(e.to_string()))?;

        let status_code = response.status().as_u16();
        let content = response
            .text()
            .await
            .map_err(|e| Error::AccessRuleRequestFailed(e.to_string()))?;

        Ok(AclResponse {
            status_code,
            content,
        })
    }
}
