//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::ClientConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a `ClientConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the client configuration from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder()
            .endpoint(cli.endpoint.clone())
            .size(cli.size.clone());

        if let Some(secs) = cli.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build().context("Invalid client configuration")
    }

    /// Check argument combinations clap cannot express
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.timeout == Some(0) {
            anyhow::bail!("--timeout must be at least 1 second");
        }

        if cli.composite.is_some() && cli.preview.is_none() {
            tracing::warn!("--composite only affects the preview; add --preview <PATH> to write it");
        }

        if cli.api_key.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("No API key given; requests will be rejected until one is set");
        }

        Ok(())
    }
}
