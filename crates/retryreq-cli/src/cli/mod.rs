//! CLI for the retryreq request executor.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use retryreq_core::config;
use std::collections::BTreeMap;
use std::path::PathBuf;

use commands::{run_classify, run_config, run_render, run_send};

/// Top-level CLI for retryreq.
#[derive(Debug, Parser)]
#[command(name = "retryreq")]
#[command(about = "Send DynamoDB-style requests with throttling-aware retries", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the XDG config dir.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Where a JSON request payload comes from.
#[derive(Debug, Args)]
pub struct Payload {
    /// Read the request JSON from a file.
    #[arg(long, value_name = "PATH", conflicts_with = "data", required_unless_present = "data")]
    pub file: Option<PathBuf>,

    /// Request JSON given inline.
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,
}

impl Payload {
    pub fn read(&self) -> Result<Vec<u8>> {
        match (&self.file, &self.data) {
            (Some(path), _) => {
                std::fs::read(path).with_context(|| format!("read {}", path.display()))
            }
            (None, Some(data)) => Ok(data.clone().into_bytes()),
            (None, None) => anyhow::bail!("one of --file or --data is required"),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request, retrying transient failures.
    Send {
        /// Operation name, e.g. GetItem (prefixed with the configured API version).
        #[arg(long)]
        target: String,

        #[command(flatten)]
        payload: Payload,

        /// Override the configured endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,

        /// Extra pre-signed header as `Name: value`; repeatable.
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,
    },

    /// Show how a response would be classified under the configured policy.
    Classify {
        /// HTTP status code.
        #[arg(long)]
        status: u16,

        /// Response body.
        #[arg(long, default_value = "")]
        body: String,

        /// Classify as a retry attempt rather than the first attempt.
        #[arg(long)]
        retry_pass: bool,
    },

    /// Print a request the way it is logged when rejected.
    Render {
        #[command(flatten)]
        payload: Payload,
    },

    /// Show the config file path and effective configuration.
    Config,
}

/// Parse `Name: value` header arguments.
pub fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for h in raw {
        let (name, value) = h
            .split_once(':')
            .with_context(|| format!("header `{}` is not NAME:VALUE", h))?;
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("header `{}` has an empty name", h);
        }
        out.insert(name.to_string(), value.trim().to_string());
    }
    Ok(out)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (cfg, cfg_path) = match &cli.config {
            Some(path) => (config::load_from(path)?, path.clone()),
            None => (config::load_or_init()?, config::config_path()?),
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Send {
                target,
                payload,
                endpoint,
                headers,
            } => {
                let headers = parse_headers(&headers)?;
                run_send(&cfg, endpoint.as_deref(), &target, payload.read()?, headers).await?
            }
            CliCommand::Classify {
                status,
                body,
                retry_pass,
            } => run_classify(&cfg, status, &body, retry_pass).await?,
            CliCommand::Render { payload } => run_render(payload.read()?).await?,
            CliCommand::Config => run_config(&cfg, &cfg_path).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
