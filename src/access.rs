//! Access rule requester.
//!
//! Grants a newly provisioned unit network reachability to the two services
//! it depends on: the keystone endpoint and the swift API endpoint. Each
//! grant is a single TCP permit rule from the unit's `/32` to the resolved
//! service `/32`, matched on the service's destination port. Fire-and-forget:
//! nothing verifies the rule beyond the API response, and a failure on one
//! rule never rolls back the other.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::net::lookup_host;
use tracing::{info, warn};

use crate::aclapi::{AclApi, L4Opts};
use crate::config::Config;
use crate::error::{Error, Result};

/// What to do when an access rule request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and report it in the returned [`RuleOutcome`].
    #[default]
    LogOnly,
    /// Surface the failure as [`Error::AccessRuleRequestFailed`].
    Fatal,
}

/// Result of one permit-rule request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The ACL API accepted the rule.
    Applied { status: u16, body: String },
    /// The request failed or was rejected; only returned under
    /// [`FailurePolicy::LogOnly`].
    Failed { detail: String },
}

/// Issues permit rules against an injected ACL API client.
pub struct AccessRuleRequester {
    acl: Arc<dyn AclApi>,
    keystone_host: String,
    keystone_port: u16,
    swift_api_host: String,
    swift_api_port: u16,
    policy: FailurePolicy,
}

impl AccessRuleRequester {
    /// Build a requester from an ACL client and the configured service
    /// endpoints, with the default log-only failure policy.
    pub fn new(acl: Arc<dyn AclApi>, config: &Config) -> Self {
        Self {
            acl,
            keystone_host: config.keystone_host.clone(),
            keystone_port: config.keystone_port,
            swift_api_host: config.swift_api_host.clone(),
            swift_api_port: config.swift_api_port,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Permit `unit_host` to reach the keystone endpoint.
    pub async fn permit_keystone_access(&self, unit_host: &str) -> Result<RuleOutcome> {
        self.permit(unit_host, "keystone", &self.keystone_host, self.keystone_port)
            .await
    }

    /// Permit `unit_host` to reach the swift API endpoint.
    pub async fn permit_swift_access(&self, unit_host: &str) -> Result<RuleOutcome> {
        self.permit(unit_host, "swift api", &self.swift_api_host, self.swift_api_port)
            .await
    }

    async fn permit(
        &self,
        unit_host: &str,
        label: &str,
        target_host: &str,
        port: u16,
    ) -> Result<RuleOutcome> {
        info!("Permitting access to {} host", label);
        info!(
            "Host is: {} port: {}; unit host is: {}",
            target_host, port, unit_host
        );

        let ip = match resolve_ipv4(target_host).await {
            Ok(ip) => ip,
            Err(Error::AccessRuleRequestFailed(detail)) => return self.fail(detail),
            Err(e) => return self.fail(e.to_string()),
        };

        let desc = format!("{} access (swift service) for unit: {}", label, unit_host);
        let source = format!("{}/32", unit_host);
        let dest = format!("{}/32", ip);
        let l4_opts = L4Opts::eq_dest(port);

        match self
            .acl
            .add_tcp_permit_access(&desc, &source, &dest, &l4_opts)
            .await
        {
            Ok(response) => {
                info!("Response is: {} - {}", response.status_code, response.content);
                if response.is_success() {
                    Ok(RuleOutcome::Applied {
                        status: response.status_code,
                        body: response.content,
                    })
                } else {
                    self.fail(format!(
                        "ACL API returned {}: {}",
                        response.status_code, response.content
                    ))
                }
            }
            Err(Error::AccessRuleRequestFailed(detail)) => self.fail(detail),
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn fail(&self, detail: String) -> Result<RuleOutcome> {
        match self.policy {
            FailurePolicy::Fatal => Err(Error::AccessRuleRequestFailed(detail)),
            FailurePolicy::LogOnly => {
                warn!("Access rule request failed: {}", detail);
                Ok(RuleOutcome::Failed { detail })
            }
        }
    }
}

/// Resolve a hostname to its first IPv4 address.
async fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    let addrs = lookup_host((host, 0u16))
        .await
        .map_err(|e| Error::AccessRuleRequestFailed(format!("Failed to resolve {}: {}", host, e)))?;

    for addr in addrs {
        if let IpAddr::V4(ip) = addr.ip() {
            return Ok(ip);
        }
    }

    Err(Error::AccessRuleRequestFailed(format!(
        "No IPv4 address for {}",
        host
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aclapi::AclResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct RecordedRule {
        desc: String,
        source: String,
        dest: String,
        comparison: String,
        port: u16,
        direction: String,
    }

    struct MockAcl {
        calls: Mutex<Vec<RecordedRule>>,
        status_code: u16,
        transport_error: bool,
    }

    impl MockAcl {
        fn responding(status_code: u16) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                status_code,
                transport_error: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                status_code: 0,
                transport_error: true,
            })
        }
    }

    #[async_trait]
    impl AclApi for MockAcl {
        async fn add_tcp_permit_access(
            &self,
            desc: &str,
            source: &str,
            dest: &str,
            l4_opts: &L4Opts,
        ) -> Result<AclResponse> {
            self.calls.lock().unwrap().push(RecordedRule {
                desc: desc.to_string(),
                source: source.to_string(),
                dest: dest.to_string(),
                comparison: l4_opts.comparison.clone(),
                port: l4_opts.port,
                direction: l4_opts.direction.clone(),
            });

            if self.transport_error {
                return Err(Error::AccessRuleRequestFailed("connection refused".to_string()));
            }

            Ok(AclResponse {
                status_code: self.status_code,
                content: "ok".to_string(),
            })
        }
    }

    // Loopback addresses resolve to themselves, which keeps the destination
    // CIDR deterministic without real DNS.
    fn config() -> Config {
        Config {
            swift_auth_url: "http://127.0.0.1:8080/auth/v1.0".to_string(),
            swift_user: "admin".to_string(),
            swift_key: "secret".to_string(),
            aclapi_user: "acl".to_string(),
            aclapi_pass: "aclpass".to_string(),
            aclapi_url: "http://127.0.0.1:9000".to_string(),
            keystone_host: "127.0.0.1".to_string(),
            keystone_port: 35357,
            swift_api_host: "127.0.0.2".to_string(),
            swift_api_port: 8080,
        }
    }

    #[tokio::test]
    async fn test_permit_keystone_submits_one_eq_dest_rule() {
        let acl = MockAcl::responding(201);
        let requester = AccessRuleRequester::new(acl.clone(), &config());

        let outcome = requester.permit_keystone_access("10.0.0.5").await.unwrap();

        let calls = acl.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source, "10.0.0.5/32");
        assert_eq!(calls[0].dest, "127.0.0.1/32");
        assert_eq!(calls[0].port, 35357);
        assert_eq!(calls[0].comparison, "eq");
        assert_eq!(calls[0].direction, "dest");
        assert!(calls[0].desc.contains("10.0.0.5"));
        assert!(matches!(outcome, RuleOutcome::Applied { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_permit_swift_targets_configured_api_endpoint() {
        let acl = MockAcl::responding(200);
        let requester = AccessRuleRequester::new(acl.clone(), &config());

        requester.permit_swift_access("10.0.0.5").await.unwrap();

        let calls = acl.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].dest, "127.0.0.2/32");
        assert_eq!(calls[0].port, 8080);
    }

    #[tokio::test]
    async fn test_rejected_rule_is_reported_not_raised_by_default() {
        let acl = MockAcl::responding(500);
        let requester = AccessRuleRequester::new(acl, &config());

        let outcome = requester.permit_keystone_access("10.0.0.5").await.unwrap();

        match outcome {
            RuleOutcome::Failed { detail } => assert!(detail.contains("500")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_reported_not_raised_by_default() {
        let acl = MockAcl::failing();
        let requester = AccessRuleRequester::new(acl, &config());

        let outcome = requester.permit_swift_access("10.0.0.5").await.unwrap();
        assert!(matches!(outcome, RuleOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_fatal_policy_raises_on_rejection() {
        let acl = MockAcl::responding(403);
        let requester =
            AccessRuleRequester::new(acl, &config()).with_policy(FailurePolicy::Fatal);

        let err = requester.permit_keystone_access("10.0.0.5").await.unwrap_err();
        assert!(matches!(err, Error::AccessRuleRequestFailed(_)));
    }

    #[tokio::test]
    async fn test_resolve_ipv4_accepts_literal_address() {
        assert_eq!(
            resolve_ipv4("192.168.1.10").await.unwrap(),
            Ipv4Addr::new(192, 168, 1, 10)
        );
    }
}
