//! # veinfo - VE node daemon client
//!
//! Command line front end over [`veinfo_core::NodeClient`].
//!
//! ## Configuration
//!
//! Settings are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults
//! 2. The TOML file given with `--config`
//! 3. `VEINFO_SOCKET_DIR`, `VEINFO_SOCKET_PREFIX`, `VEINFO_FATAL_POLICY`
//!
//! The node comes from `--node` or `VE_NODE_NUMBER`.
//!
//! ## Exit status
//!
//! 0 on success. On failure the error chain goes to stderr (or a JSON error
//! object to stdout with `--json`) and the exit code follows
//! [`json::ErrorCode::exit_code`].

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;
mod commands;
mod json;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use veinfo_core::{ClientConfig, Error, NodeClient, NodeId};

use crate::cli::Cli;
use crate::commands::Format;
use crate::json::{ErrorCode, JsonError};

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let format = if cli.json { Format::Json } else { Format::Text };

    match run(cli, format) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => report(&err, format),
    }
}

fn run(cli: Cli, format: Format) -> Result<String> {
    let config = load_config(&cli)?;
    debug!(?config, node = cli.node, "configuration resolved");

    let client = NodeClient::new(config, NodeId(cli.node));
    commands::execute_command(&client, cli.command, format)
        .with_context(|| format!("command failed on VE node {}", cli.node))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let base = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };
    base.with_env_overrides()
        .context("invalid environment configuration")
}

fn report(err: &anyhow::Error, format: Format) -> ExitCode {
    let client_error = err.downcast_ref::<Error>();

    if format == Format::Json {
        if let Some(client_error) = client_error {
            if let Ok(body) = serde_json::to_string_pretty(&JsonError::from_error(client_error)) {
                println!("{body}");
            }
        }
    }
    eprintln!("error: {err:#}");

    let code = client_error.map_or(1, |e| ErrorCode::classify(e).exit_code());
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
