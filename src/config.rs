//! Process-wide configuration.
//!
//! Loaded once at startup from the environment and treated as read-only for
//! the lifetime of the process. Credentials are required; the hosts and ports
//! used for access rules fall back to in-cluster service names.

use anyhow::{Context, Result};
use std::env;

/// Configuration consumed by the storage session and the access rule requester.
#[derive(Debug, Clone)]
pub struct Config {
    /// Swift auth endpoint for the direct-credential exchange.
    pub swift_auth_url: String,
    pub swift_user: String,
    pub swift_key: String,

    /// ACL API credentials and base URL.
    pub aclapi_user: String,
    pub aclapi_pass: String,
    pub aclapi_url: String,

    /// Keystone host/port a provisioned unit must be able to reach.
    pub keystone_host: String,
    pub keystone_port: u16,

    /// Swift API host/port a provisioned unit must be able to reach.
    pub swift_api_host: String,
    pub swift_api_port: u16,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            swift_auth_url: required("SWIFT_AUTH_URL")?,
            swift_user: required("SWIFT_USER")?,
            swift_key: required("SWIFT_KEY")?,
            aclapi_user: required("ACLAPI_USER")?,
            aclapi_pass: required("ACLAPI_PASS")?,
            aclapi_url: required("ACLAPI_URL")?,
            keystone_host: env::var("KEYSTONE_HOST").unwrap_or_else(|_| "keystone".to_string()),
            keystone_port: port("KEYSTONE_PORT", 35357)?,
            swift_api_host: env::var("SWIFT_API_HOST").unwrap_or_else(|_| "swift".to_string()),
            swift_api_port: port("SWIFT_API_PORT", 8080)?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} is not set", name))
}

fn port(name: &str, default: u16) -> Result<u16> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} is not a valid port: {}", name, value)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_default_when_unset() {
        assert_eq!(port("SWIFT_PROVISIONER_TEST_PORT_UNSET", 8080).unwrap(), 8080);
    }

    #[test]
    fn test_port_parses_override() {
        env::set_var("SWIFT_PROVISIONER_TEST_PORT_SET", "35357");
        assert_eq!(port("SWIFT_PROVISIONER_TEST_PORT_SET", 8080).unwrap(), 35357);
    }

    #[test]
    fn test_port_rejects_garbage() {
        env::set_var("SWIFT_PROVISIONER_TEST_PORT_BAD", "not-a-port");
        assert!(port("SWIFT_PROVISIONER_TEST_PORT_BAD", 8080).is_err());
    }

    #[test]
    fn test_required_missing_var() {
        let err = required("SWIFT_PROVISIONER_TEST_MISSING").unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }
}
