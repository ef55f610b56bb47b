//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── dispatch: DispatchConfig  # Client id, attempts, backoff, timeout
//! ├── http: ReqwestConfig       # HTTP client timeout and user agent
//! └── command: Command          # run | stop | send | bulk
//! ```
//!
//! All options can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! communitee --max-attempts 5 run https://hooks.example.com/webhook/start
//!
//! # Or via environment variables
//! DISPATCH_MAX_ATTEMPTS=5 communitee run https://hooks.example.com/webhook/start
//! ```

use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use communitee_webhook::reqwest::ReqwestConfig;
use communitee_webhook::{DispatchConfig, WebhookAction};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "communitee")]
#[command(about = "Trigger Communitee automation webhooks")]
#[command(version)]
pub struct Cli {
    /// Dispatch behavior: client identifier, retries and timeouts.
    #[clap(flatten)]
    pub dispatch: DispatchConfig,

    /// HTTP client configuration.
    #[clap(flatten)]
    pub http: ReqwestConfig,

    /// Action to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the CLI.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Send a `run` action to a webhook.
    Run {
        /// Webhook URL (https only).
        url: String,
    },
    /// Send a `stop` action to a webhook.
    Stop {
        /// Webhook URL (https only).
        url: String,
    },
    /// Send an arbitrary JSON object to a webhook.
    Send {
        /// Webhook URL (https only).
        url: String,
        /// JSON object to send.
        #[arg(long)]
        payload: String,
    },
    /// Send the same action to several webhooks concurrently.
    Bulk {
        /// Action to send (`run` or `stop`).
        #[arg(long)]
        action: WebhookAction,
        /// Webhook URLs (https only).
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs go to stderr; stdout carries only the JSON result.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.dispatch
            .validate()
            .context("invalid dispatch configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            client_id = %self.dispatch.effective_client_id(),
            timeout_secs = self.dispatch.effective_timeout().as_secs(),
            max_attempts = self.dispatch.max_attempts,
            base_delay_ms = self.dispatch.base_delay_ms,
            max_delay_ms = self.dispatch.max_delay_ms,
            http_timeout_secs = self.http.effective_timeout().as_secs(),
            http_connect_timeout_secs = self.http.effective_connect_timeout().as_secs(),
            "Dispatch configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
