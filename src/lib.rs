//! Swift Provisioning Agent Library
//!
//! Glue between a PaaS unit-provisioning workflow and two external services:
//! a Swift object-storage endpoint and a network access-control (ACL) API.
//!
//! Two independent pieces:
//!
//! - [`SwiftSession`]: one authenticated storage connection exposing
//!   account/container operations (creation, removal signals, listing, CORS
//!   allow-origin management). Built either from direct credentials or by
//!   reusing a [`KeystoneSession`] token.
//! - [`AccessRuleRequester`]: permits a unit's address to reach the keystone
//!   and swift API endpoints through TCP permit rules submitted to the ACL
//!   API.
//!
//! Configuration comes from the process environment once at startup
//! ([`Config::from_env`]); nothing is persisted between invocations.

pub mod access;
pub mod aclapi;
pub mod config;
pub mod error;
pub mod generate;
pub mod keystone;
pub mod swift;

pub use access::{AccessRuleRequester, FailurePolicy, RuleOutcome};
pub use aclapi::{AclApi, AclApiClient, AclResponse, L4Opts};
pub use config::Config;
pub use error::{Error, Result};
pub use generate::{generate_container_name, generate_password};
pub use keystone::{IdentitySession, KeystoneSession, StorageEndpoints};
pub use swift::{ContainerInfo, Headers, HttpStorageConnection, StorageConnection, SwiftSession};
