//! Utilities for running commands with proper error handling and timeouts

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

/// Build a command with piped output and the given extra environment
pub fn command<P: AsRef<OsStr>>(program: P, args: &[String], envs: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(envs.iter().copied());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd
}

/// Run a command to completion with optional timeout, failing on non-zero exit
pub async fn run_command<P: AsRef<OsStr>>(
    program: P,
    args: &[String],
    envs: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<Output> {
    let program = program.as_ref();
    let command_line = format!("{} {}", program.to_string_lossy(), args.join(" "));
    debug!("Running command: {}", command_line);

    let mut cmd = command(program, args, envs);
    cmd.kill_on_drop(true);

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("Command timed out after {:?}: {}", limit, command_line))?,
        None => cmd.output().await,
    }
    .with_context(|| format!("Failed to execute {}", command_line))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("Command failed: {}", command_line);
        error!("Stderr: {}", stderr.trim_end());
        anyhow::bail!(
            "Command failed with exit code {:?}: {}",
            output.status.code(),
            stderr.trim_end()
        );
    }

    Ok(output)
}

/// Run a command and return stdout as string
pub async fn run_command_stdout<P: AsRef<OsStr>>(
    program: P,
    args: &[String],
    envs: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<String> {
    let output = run_command(program, args, envs, timeout).await?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
