//! Update checker.
//!
//! Compares the build id Steam advertises for the tracked branch with the
//! build id of the local install and, when they differ, sends
//! `update-ready` to the game server.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::actions::Action;
use crate::build_id::{latest_build_id, manifest_build_id, BuildId};
use crate::command::CommandBatch;
use crate::config::Config;
use crate::transport::{CommandSender, Response};

/// Result of comparing the advertised and installed builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate(BuildId),
    Available { installed: BuildId, latest: BuildId },
    /// One of the two build ids could not be determined.
    Unknown,
}

impl UpdateStatus {
    pub fn decide(latest: Option<BuildId>, installed: Option<BuildId>) -> Self {
        match (latest, installed) {
            (Some(latest), Some(installed)) if latest == installed => Self::UpToDate(installed),
            (Some(latest), Some(installed)) => Self::Available { installed, latest },
            _ => Self::Unknown,
        }
    }
}

/// What a check run did.
#[derive(Debug)]
pub struct UpdateReport {
    pub status: UpdateStatus,
    /// Server reply when `update-ready` was sent.
    pub response: Option<Response>,
}

/// Ask steamcmd for the build id of `branch`.
///
/// Runs `steamcmd +login anonymous +app_info_print <app_id> +quit`, killing
/// it if it outlives `timeout`. A missing branch or build id yields `None`.
#[instrument(skip(steamcmd), fields(steamcmd = %steamcmd))]
pub async fn fetch_latest_build_id(
    steamcmd: &str,
    app_id: &str,
    branch: &str,
    timeout: Duration,
) -> Result<Option<BuildId>> {
    let mut cmd = Command::new(steamcmd);
    cmd.args(["+login", "anonymous", "+app_info_print", app_id, "+quit"]);
    let buf = capture_stdout(cmd, steamcmd, timeout).await?;

    let output = String::from_utf8_lossy(&buf);
    let id = latest_build_id(output.lines(), branch);
    if id.is_none() {
        warn!(branch = %branch, "Could not find build id for branch");
    }
    Ok(id)
}

/// Run `cmd` to completion and return its stdout.
///
/// Reading the output and waiting for exit share one `timeout`; a process
/// that closes stdout but keeps running is killed when it expires.
async fn capture_stdout(mut cmd: Command, label: &str, timeout: Duration) -> Result<Vec<u8>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to run {label}; is it installed and on PATH?"))?;

    let mut stdout = child.stdout.take().context("Failed to open stdout")?;
    let run = async {
        let mut buf = Vec::new();
        stdout
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("Failed to read {label} output"))?;
        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for {label}"))?;
        Ok::<_, anyhow::Error>((buf, status))
    };
    let outcome = tokio::time::timeout(timeout, run).await;

    let Ok(finished) = outcome else {
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill {label}");
        }
        anyhow::bail!("{label} timed out after {timeout:?}");
    };
    let (buf, status) = finished?;
    anyhow::ensure!(status.success(), "{label} exited with {status}");
    Ok(buf)
}

/// Read the installed build id from the app manifest.
pub fn read_installed_build_id(manifest: &Path) -> Result<Option<BuildId>> {
    let content = std::fs::read_to_string(manifest)
        .with_context(|| format!("Could not read app manifest at {}", manifest.display()))?;
    let id = manifest_build_id(&content);
    if id.is_none() {
        warn!(path = %manifest.display(), "Could not parse build id from app manifest");
    }
    Ok(id)
}

/// Send `update-ready` when `status` says an update is available.
pub async fn notify_if_available(
    status: &UpdateStatus,
    sender: &dyn CommandSender,
    host: &str,
    port: u16,
) -> Result<Option<Response>> {
    let UpdateStatus::Available { installed, latest } = status else {
        return Ok(None);
    };
    info!(%installed, %latest, "New update available");

    let batch = CommandBatch::single(Action::UpdateReady.into_command()?);
    let response = sender
        .send(host, port, &batch)
        .await
        .with_context(|| format!("Failed to notify {host}:{port} of the update"))?;

    if response.is_success() {
        info!("Server acknowledged update-ready");
    } else {
        warn!(error = response.first_error(), "Server rejected update-ready");
    }
    Ok(Some(response))
}

/// Run one full check: query Steam, read the manifest, notify if needed.
pub async fn check_for_update(config: &Config, sender: &dyn CommandSender) -> Result<UpdateReport> {
    let manifest = config
        .manifest_path()
        .context("install_dir is not configured")?;
    let port = config
        .remote_command_port
        .context("RemoteCommandPort is not configured")?;

    info!(branch = %config.branch(), "Checking for updates");
    let latest = fetch_latest_build_id(
        &config.steamcmd,
        &config.app_id,
        config.branch(),
        Duration::from_secs(config.steamcmd_timeout_seconds),
    )
    .await?;
    let installed = read_installed_build_id(&manifest)?;

    debug!(latest = ?latest, installed = ?installed, "Build ids");
    let status = UpdateStatus::decide(latest, installed);
    if !matches!(status, UpdateStatus::Available { .. }) {
        info!(status = ?status, "No new update available");
    }

    let response = notify_if_available(&status, sender, &config.server_host, port).await?;
    Ok(UpdateReport { status, response })
}
