//! server-commander
//!
//! Sends remote commands to a game server, checks Steam for server updates,
//! and serves the command set as MCP tools over stdio.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use server_commander::config::{Config, DEFAULT_CONFIG_PATH};
use server_commander::{mcp, update, Argument, CommandSender, TcpCommandClient, Timeouts};

#[derive(Parser, Debug)]
#[command(name = "server-commander")]
#[command(about = "Remote command client and operator tools for a game server")]
struct Args {
    /// Path to config.json
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Send one command and print the server's response
    Send {
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server remote command port
        #[arg(long)]
        port: u16,

        /// Command name (e.g. update-ready)
        name: String,

        /// Arguments; strings unless prefixed with int:, float: or bool: (str: escapes)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Compare the installed build with Steam and notify the server if outdated
    CheckUpdate,

    /// Serve the command set as MCP tools
    Serve {
        /// Run in stdio mode (for MCP clients)
        #[arg(long)]
        stdio: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr so stdout is free for MCP protocol and responses)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Cmd::Send {
            host,
            port,
            name,
            args: raw_args,
        } => {
            let timeouts = optional_config(&args.config)?
                .map(|c| c.transport_timeouts())
                .unwrap_or_default();
            send(&host, port, &name, &raw_args, timeouts).await
        }
        Cmd::CheckUpdate => {
            let config = Config::from_file(&args.config).context("Failed to load configuration")?;
            let client = TcpCommandClient::new(config.transport_timeouts());
            let report = update::check_for_update(&config, &client).await?;
            if let Some(resp) = report.response {
                anyhow::ensure!(
                    resp.is_success(),
                    "Server rejected update-ready: {}",
                    resp.first_error().unwrap_or_default()
                );
            }
            Ok(())
        }
        Cmd::Serve { stdio } => {
            let config = Config::from_file(&args.config).context("Failed to load configuration")?;
            info!(
                host = %config.server_host,
                ports = ?config.server_ports,
                "Loaded configuration"
            );
            let client = TcpCommandClient::new(config.transport_timeouts());

            if stdio {
                mcp::serve_stdio(config, client).await
            } else {
                anyhow::bail!("Only --stdio mode is currently supported");
            }
        }
    }
}

/// Load the config file if it exists; `send` works without one.
fn optional_config(path: &Path) -> Result<Option<Config>> {
    if path.exists() {
        Config::from_file(path).map(Some)
    } else {
        Ok(None)
    }
}

async fn send(host: &str, port: u16, name: &str, raw_args: &[String], timeouts: Timeouts) -> Result<()> {
    let arguments = raw_args
        .iter()
        .map(|a| Argument::parse_typed(a))
        .collect::<server_commander::Result<Vec<_>>>()
        .context("Invalid command argument")?;
    let client = TcpCommandClient::new(timeouts);

    let response = client
        .send_one(host, port, name, arguments)
        .await
        .with_context(|| format!("Failed to send '{name}' to {host}:{port}"))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    anyhow::ensure!(
        response.is_success(),
        "Server reported failure: {}",
        response.first_error().unwrap_or_default()
    );
    Ok(())
}
