//! Docker CLI utilities for running restic containers

use super::command::{command, run_command, run_command_stdout};
use super::runtime::{ExecutionRequest, LogStream};
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

/// Locate the docker client
fn docker_binary() -> Result<PathBuf> {
    which::which("docker").context("docker executable not found in PATH")
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Pull an image
pub async fn pull_image(image: &str) -> Result<()> {
    run_command(docker_binary()?, &args(&["pull", image]), &[], None).await?;
    Ok(())
}

/// List all Docker volumes
pub async fn list_volumes(timeout: Duration) -> Result<Vec<String>> {
    let output = run_command_stdout(
        docker_binary()?,
        &args(&["volume", "ls", "--format", "{{.Name}}"]),
        &[],
        Some(timeout),
    )
    .await?;

    Ok(output
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect())
}

/// Gateway of the first IPAM configuration of a network
pub async fn network_gateway(network: &str, timeout: Duration) -> Result<Option<String>> {
    let output = run_command_stdout(
        docker_binary()?,
        &args(&["network", "inspect", "--format", "{{json .IPAM.Config}}", network]),
        &[],
        Some(timeout),
    )
    .await?;

    parse_gateway(&output)
}

/// Parse the `IPAM.Config` JSON list printed by `docker network inspect`
pub fn parse_gateway(output: &str) -> Result<Option<String>> {
    let config: serde_json::Value =
        serde_json::from_str(output.trim()).context("Failed to parse network IPAM JSON")?;

    Ok(config
        .get(0)
        .and_then(|c| c.get("Gateway"))
        .and_then(|g| g.as_str())
        .filter(|g| !g.is_empty())
        .map(|g| g.to_string()))
}

/// `docker run --detach` arguments for a request.
///
/// Environment values are not part of the arguments; `--env KEY` makes docker
/// take them from the client's environment.
pub fn run_arguments(request: &ExecutionRequest) -> Vec<String> {
    let mut result = args(&["run", "--detach"]);

    for key in request.env.keys() {
        result.push("--env".to_string());
        result.push(key.clone());
    }

    for (source, mount) in &request.mounts {
        result.push("--volume".to_string());
        result.push(format!("{}:{}:{}", source, mount.bind, mount.mode));
    }

    for (host, address) in &request.extra_hosts {
        result.push("--add-host".to_string());
        result.push(format!("{}:{}", host, address));
    }

    result.push(request.image.clone());
    result.extend(request.command.iter().cloned());
    result
}

/// Removes the container when dropped
struct ContainerGuard {
    docker: PathBuf,
    id: String,
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let result = std::process::Command::new(&self.docker)
            .args(["rm", "--force", self.id.as_str()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => debug!("Removed container {}", self.id),
            Ok(status) => warn!("Removing container {} failed: {}", self.id, status),
            Err(e) => warn!("Removing container {} failed: {}", self.id, e),
        }
    }
}

/// Run a container, stream its logs, wait for it and remove it
pub async fn run_container(
    request: &ExecutionRequest,
    on_line: &mut dyn FnMut(LogStream, &str),
) -> Result<i32> {
    let docker = docker_binary()?;
    let envs: Vec<(&str, &str)> = request
        .env
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let id = run_command_stdout(&docker, &run_arguments(request), &envs, None)
        .await
        .context("Failed to start the restic container")?
        .trim()
        .to_string();

    let _guard = ContainerGuard {
        docker: docker.clone(),
        id: id.clone(),
    };

    debug!("Started container {}", id);

    stream_logs(&docker, &id, on_line).await?;

    let status = run_command_stdout(&docker, &args(&["wait", &id]), &[], None)
        .await
        .context("Failed to wait for the restic container")?;

    status
        .trim()
        .parse::<i32>()
        .with_context(|| format!("Unexpected exit status from docker wait: {:?}", status))
}

/// Follow the container logs until it exits
async fn stream_logs(
    docker: &Path,
    id: &str,
    on_line: &mut dyn FnMut(LogStream, &str),
) -> Result<()> {
    let mut child = command(docker, &args(&["logs", "--follow", id]), &[])
        .spawn()
        .context("Failed to follow the container logs")?;

    let stdout = child.stdout.take().context("Container stdout not captured")?;
    let stderr = child.stderr.take().context("Container stderr not captured")?;
    forward_lines(stdout, stderr, on_line).await?;

    child.wait().await.context("Failed to follow the container logs")?;
    Ok(())
}

/// Hand the lines of both streams to `on_line` until both are closed.
///
/// Output is not required to be UTF-8; invalid sequences are replaced.
async fn forward_lines<O, E>(
    stdout: O,
    stderr: E,
    on_line: &mut dyn FnMut(LogStream, &str),
) -> Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = BufReader::new(stdout).split(b'\n');
    let mut stderr = BufReader::new(stderr).split(b'\n');
    let (mut stdout_done, mut stderr_done) = (false, false);

    while !(stdout_done && stderr_done) {
        tokio::select! {
            segment = stdout.next_segment(), if !stdout_done => {
                match segment.context("Failed to read the container logs")? {
                    Some(bytes) => on_line(LogStream::Stdout, &decode_line(&bytes)),
                    None => stdout_done = true,
                }
            },
            segment = stderr.next_segment(), if !stderr_done => {
                match segment.context("Failed to read the container logs")? {
                    Some(bytes) => on_line(LogStream::Stderr, &decode_line(&bytes)),
                    None => stderr_done = true,
                }
            },
        }
    }

    Ok(())
}

fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}
