//! Swift Provisioning Agent
//!
//! One provisioning action per invocation against the configured Swift and
//! ACL API endpoints. Credentials and endpoints come from the environment
//! (`SWIFT_AUTH_URL`, `SWIFT_USER`, `SWIFT_KEY`, `ACLAPI_USER`, `ACLAPI_PASS`,
//! `ACLAPI_URL`, `KEYSTONE_HOST`/`PORT`, `SWIFT_API_HOST`/`PORT`).
//!
//! # Usage
//! ```bash
//! # Create a container with a generated name
//! swift-provisioner create-container --header X-Container-Meta-Owner=app1
//!
//! # Allow an origin on a container
//! swift-provisioner set-cors --container a1b2c3 --url https://app.example.com
//!
//! # Grant a new unit access to keystone and the swift API
//! swift-provisioner permit --unit-host 10.0.0.5
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use swift_provisioner::{
    generate_container_name, generate_password, AccessRuleRequester, AclApiClient, Config,
    FailurePolicy, Headers, RuleOutcome, SwiftSession,
};

#[derive(Parser)]
#[command(name = "swift-provisioner")]
#[command(about = "Swift account/container provisioning agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List containers for the configured account
    ListContainers,

    /// Create a container, or update its metadata
    CreateContainer {
        /// Container name; a random name is generated when omitted
        #[arg(long)]
        name: Option<String>,

        /// Metadata header in KEY=VALUE form, repeatable
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,
    },

    /// Post removal-signal headers to a container
    RemoveContainer {
        #[arg(long)]
        name: String,

        /// Removal header in KEY=VALUE form, repeatable
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,
    },

    /// Apply account-level metadata headers
    CreateAccount {
        /// Metadata header in KEY=VALUE form, repeatable
        #[arg(long = "header", value_name = "KEY=VALUE")]
        headers: Vec<String>,
    },

    /// Mark an account subject for removal
    RemoveAccount {
        #[arg(long)]
        subject: String,
    },

    /// Read a container's CORS allow-origin value
    GetCors {
        #[arg(long)]
        container: String,
    },

    /// Add an origin to a container's CORS allow-origin value
    SetCors {
        #[arg(long)]
        container: String,

        #[arg(long)]
        url: String,

        /// Replace the existing value instead of appending
        #[arg(long)]
        replace: bool,
    },

    /// Remove an origin from a container's CORS allow-origin value
    UnsetCors {
        #[arg(long)]
        container: String,

        #[arg(long)]
        url: String,
    },

    /// Grant a unit network access to the keystone and swift API hosts
    Permit {
        /// Unit IPv4 address
        #[arg(long, env = "UNIT_HOST")]
        unit_host: String,

        /// Treat access-rule failures as fatal instead of log-only
        #[arg(long)]
        strict: bool,
    },

    /// Generate a random container name
    GenName,

    /// Generate a random password
    GenPassword {
        #[arg(long, default_value = "8")]
        length: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Generation helpers need no endpoint configuration.
    match &cli.command {
        Commands::GenName => {
            println!("{}", generate_container_name());
            return Ok(());
        }
        Commands::GenPassword { length } => {
            println!("{}", generate_password(*length));
            return Ok(());
        }
        _ => {}
    }

    let config = Config::from_env().context("Failed to load configuration from environment")?;

    match cli.command {
        Commands::ListContainers => {
            let session = storage_session(&config).await?;
            let containers = session.account_containers().await?;

            println!("{:<24} {:>8} {:>14}", "NAME", "COUNT", "BYTES");
            for container in &containers {
                println!(
                    "{:<24} {:>8} {:>14}",
                    container.name, container.count, container.bytes
                );
            }
            info!("Listed {} containers", containers.len());
        }

        Commands::CreateContainer { name, headers } => {
            let name = name.unwrap_or_else(generate_container_name);
            let session = storage_session(&config).await?;
            session.create_container(&name, parse_headers(&headers)?).await?;
            println!("✅ Created container: {}", name);
        }

        Commands::RemoveContainer { name, headers } => {
            let session = storage_session(&config).await?;
            session.remove_container(&name, parse_headers(&headers)?).await?;
            println!("✅ Signalled removal of container: {}", name);
        }

        Commands::CreateAccount { headers } => {
            let session = storage_session(&config).await?;
            session.create_account(parse_headers(&headers)?).await?;
            println!("✅ Applied account headers");
        }

        Commands::RemoveAccount { subject } => {
            let session = storage_session(&config).await?;
            session.remove_account(&subject).await?;
            println!("✅ Marked account subject for removal: {}", subject);
        }

        Commands::GetCors { container } => {
            let session = storage_session(&config).await?;
            println!("{}", session.get_cors(&container).await?);
        }

        Commands::SetCors { container, url, replace } => {
            let session = storage_session(&config).await?;
            session.set_cors(&container, &url, !replace).await?;
            println!("✅ Updated CORS allow-origin on {}", container);
        }

        Commands::UnsetCors { container, url } => {
            let session = storage_session(&config).await?;
            session.unset_cors(&container, &url).await?;
            println!("✅ Removed {} from CORS allow-origin on {}", url, container);
        }

        Commands::Permit { unit_host, strict } => {
            let acl = Arc::new(AclApiClient::new(
                &config.aclapi_user,
                &config.aclapi_pass,
                &config.aclapi_url,
            ));
            let policy = if strict {
                FailurePolicy::Fatal
            } else {
                FailurePolicy::LogOnly
            };
            let requester = AccessRuleRequester::new(acl, &config).with_policy(policy);

            report_outcome("keystone", requester.permit_keystone_access(&unit_host).await?);
            report_outcome("swift api", requester.permit_swift_access(&unit_host).await?);
        }

        Commands::GenName | Commands::GenPassword { .. } => unreachable!(),
    }

    Ok(())
}

async fn storage_session(config: &Config) -> Result<SwiftSession> {
    SwiftSession::from_credentials(&config.swift_auth_url, &config.swift_user, &config.swift_key)
        .await
        .context("Failed to authenticate with the storage endpoint")
}

fn parse_headers(raw: &[String]) -> Result<Headers> {
    raw.iter()
        .map(|header| {
            header
                .split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .with_context(|| format!("Invalid header (expected KEY=VALUE): {}", header))
        })
        .collect()
}

fn report_outcome(label: &str, outcome: RuleOutcome) {
    match outcome {
        RuleOutcome::Applied { status, .. } => {
            println!("✅ {} rule applied ({})", label, status);
        }
        RuleOutcome::Failed { detail } => {
            println!("⚠️  {} rule failed: {}", label, detail);
        }
    }
}
