//! Orchestrator - runs one subcommand against the container runtime

use crate::config::ResolvedConfig;
use crate::error::{Result, ToolError};
use crate::managers::arguments::{CommandSynthesizer, Invocation};
use crate::managers::metrics;
use crate::settings::{Settings, SubCommand};
use crate::utils::runtime::{ContainerRuntime, LogStream};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Host alias under which restic containers reach the host
pub const OWN_HOSTNAME: &str = "restictool.local";

/// Network whose gateway is the host's own address
pub const BRIDGE_NETWORK_NAME: &str = "bridge";

/// Outcome of a backup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Volumes and local directories in processing order
    pub resources: Vec<String>,

    /// Highest exit code of the backup, forget and prune runs
    pub max_exit_code: i32,

    pub metrics_written: bool,
}

/// What an invocation did, beyond its success
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub backup: Option<BackupSummary>,
}

/// How container output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Forward,
    Suppress,
}

/// Receives the container output forwarded to the operator
pub trait OutputSink {
    fn line(&self, stream: LogStream, line: &str);
}

/// Writes container output to the process's stdout and stderr
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn line(&self, stream: LogStream, line: &str) {
        match stream {
            LogStream::Stdout => println!("{}", line),
            LogStream::Stderr => eprintln!("{}", line),
        }
    }
}

pub struct ResticTool<R: ContainerRuntime> {
    settings: Settings,
    config: ResolvedConfig,
    runtime: R,
    sink: Box<dyn OutputSink>,
    own_ip_address: Option<String>,
}

impl<R: ContainerRuntime> ResticTool<R> {
    pub fn new(mut settings: Settings, config: ResolvedConfig, runtime: R) -> Self {
        settings.make_paths_absolute();

        Self {
            settings,
            config,
            runtime,
            sink: Box::new(ConsoleSink),
            own_ip_address: None,
        }
    }

    /// Send forwarded container output somewhere other than the console
    pub fn with_sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Address discovered on the bridge network, once `run` has started
    pub fn own_ip_address(&self) -> Option<&str> {
        self.own_ip_address.as_deref()
    }

    /// Run the configured subcommand
    pub fn run(&mut self) -> Result<RunReport> {
        if self.settings.subcommand == SubCommand::Check {
            info!("Configuration is valid");
            return Ok(RunReport::default());
        }

        self.pull_if_needed()?;
        self.create_directories()?;
        self.own_ip_address = self.find_own_address();

        let subcommand = self.settings.subcommand.clone();
        match subcommand {
            SubCommand::Check => Ok(RunReport::default()),
            SubCommand::Run => self.run_general(Invocation::Run),
            SubCommand::Snapshots => self.run_general(Invocation::Snapshots),
            SubCommand::Exists => self.run_exists(),
            SubCommand::Restore {
                directory,
                snapshot,
            } => self.run_restore(&directory, &snapshot),
            SubCommand::Backup { prune } => self.run_backup(prune),
        }
    }

    fn run_general(&self, invocation: Invocation<'_>) -> Result<RunReport> {
        let code = self.execute(&invocation, Output::Forward)?;
        check_exit_code(code)?;
        Ok(RunReport::default())
    }

    fn run_exists(&self) -> Result<RunReport> {
        let code = self.execute(&Invocation::Exists, Output::Suppress)?;
        let location = self.config.repository_location();

        if code == 0 {
            info!("Repository '{}' exists", location);
        } else {
            warn!(
                "Repository '{}' does not exist or is not reachable",
                location
            );
        }

        Ok(RunReport::default())
    }

    fn run_restore(&self, directory: &Path, snapshot: &str) -> Result<RunReport> {
        let invocation = Invocation::Restore {
            snapshot,
            directory,
        };
        let code = self.execute(&invocation, Output::Forward)?;
        check_exit_code(code)?;

        info!("Restore to {:?} successful", directory);
        Ok(RunReport::default())
    }

    fn run_backup(&self, prune: bool) -> Result<RunReport> {
        let mut volumes: Vec<String> = self
            .runtime
            .list_volumes()?
            .into_iter()
            .filter(|v| self.config.is_volume_backed_up(v))
            .collect();
        volumes.sort();

        let mut summary = BackupSummary::default();

        for volume in &volumes {
            info!("Backing up volume '{}'", volume);
            let code = self.execute(&Invocation::BackupVolume { name: volume }, Output::Forward)?;
            summary.max_exit_code = summary.max_exit_code.max(code);
            summary.resources.push(volume.clone());
        }

        for (tag, path) in &self.config.localdirs_to_backup {
            info!("Backing up local directory '{}'", path);
            let code = self.execute(&Invocation::BackupLocalDir { tag, path }, Output::Forward)?;
            summary.max_exit_code = summary.max_exit_code.max(code);
            summary.resources.push(path.clone());
        }

        if summary.resources.is_empty() {
            warn!("Nothing to back up");
            return Ok(RunReport {
                backup: Some(summary),
            });
        }

        if self.config.is_forget_specified() {
            info!("Forgetting expired backups");
            let code = self.execute(&Invocation::Forget, Output::Forward)?;
            summary.max_exit_code = summary.max_exit_code.max(code);

            if prune {
                info!("Pruning the repository");
                let code = self.execute(&Invocation::Prune, Output::Forward)?;
                summary.max_exit_code = summary.max_exit_code.max(code);
            }
        }

        if summary.max_exit_code != 0 {
            warn!(
                "Backup finished, highest restic exit code was {}",
                summary.max_exit_code
            );
        }

        summary.metrics_written = self.write_metrics();

        Ok(RunReport {
            backup: Some(summary),
        })
    }

    /// Write the metrics file if configured; failures are only logged
    fn write_metrics(&self) -> bool {
        let Some(path) = self.config.metrics_path() else {
            return false;
        };

        if !self.config.metrics_dir_exists() {
            warn!("Metrics directory for {:?} does not exist, skipping metrics", path);
            return false;
        }

        let mut output = String::new();
        let code = match self.execute_captured(&Invocation::LatestSnapshots, &mut output) {
            Ok(code) => code,
            Err(e) => {
                warn!("Could not list snapshots for metrics: {}", e);
                return false;
            }
        };

        if code != 0 {
            warn!("Listing snapshots for metrics failed with code {}", code);
            return false;
        }

        let written = metrics::parse_snapshots(&output).and_then(|records| {
            metrics::write_to_file(&path, self.config.repository_location(), &records)
        });

        match written {
            Ok(()) => {
                info!("Metrics written to {:?}", path);
                true
            }
            Err(e) => {
                warn!("Could not write metrics: {}", e);
                false
            }
        }
    }

    fn synthesizer(&self) -> CommandSynthesizer<'_> {
        CommandSynthesizer::new(
            &self.config,
            &self.settings.cache_directory,
            &self.settings.restic_arguments,
            self.settings.quiet,
        )
    }

    fn extra_hosts(&self) -> BTreeMap<String, String> {
        self.own_ip_address
            .iter()
            .map(|ip| (OWN_HOSTNAME.to_string(), ip.clone()))
            .collect()
    }

    /// Run one container, forwarding or dropping its output
    fn execute(&self, invocation: &Invocation<'_>, output: Output) -> Result<i32> {
        let request = self
            .synthesizer()
            .request(&self.settings.image, invocation, &self.extra_hosts());
        debug!("Running restic {}", request.command.join(" "));

        let sink = self.sink.as_ref();
        let mut on_line = |stream: LogStream, line: &str| {
            if output == Output::Forward {
                sink.line(stream, line);
            }
        };

        Ok(self.runtime.run(&request, &mut on_line)?)
    }

    /// Run one container, collecting its standard output
    fn execute_captured(&self, invocation: &Invocation<'_>, captured: &mut String) -> Result<i32> {
        let request = self
            .synthesizer()
            .request(&self.settings.image, invocation, &self.extra_hosts());
        debug!("Running restic {}", request.command.join(" "));

        let mut on_line = |stream: LogStream, line: &str| match stream {
            LogStream::Stdout => {
                captured.push_str(line);
                captured.push('\n');
            }
            LogStream::Stderr => debug!("restic: {}", line),
        };

        Ok(self.runtime.run(&request, &mut on_line)?)
    }

    fn pull_if_needed(&self) -> Result<()> {
        if self.settings.force_pull {
            info!("Pulling image {}", self.settings.image);
            self.runtime.pull_image(&self.settings.image)?;
        }
        Ok(())
    }

    fn create_directories(&self) -> Result<()> {
        create_directory(&self.settings.cache_directory, "cache")?;

        if let SubCommand::Restore { directory, .. } = &self.settings.subcommand {
            create_directory(directory, "restore")?;
        }
        Ok(())
    }

    /// Own address on the bridge network; any failure means no address
    fn find_own_address(&self) -> Option<String> {
        match self.runtime.network_gateway(BRIDGE_NETWORK_NAME) {
            Ok(Some(address)) => {
                debug!(
                    "Own address on the '{}' network: {}",
                    BRIDGE_NETWORK_NAME, address
                );
                Some(address)
            }
            Ok(None) => {
                warn!(
                    "Network '{}' has no gateway, own address won't be added",
                    BRIDGE_NETWORK_NAME
                );
                None
            }
            Err(e) => {
                warn!(
                    "Network '{}' not recognized, own address won't be added: {}",
                    BRIDGE_NETWORK_NAME, e
                );
                None
            }
        }
    }
}

fn check_exit_code(code: i32) -> Result<()> {
    if code != 0 {
        error!("restic exited with code {}", code);
        return Err(ToolError::EngineExecution { code });
    }
    Ok(())
}

fn create_directory(path: &Path, kind: &'static str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    info!("Creating {} directory {:?}", kind, path);
    fs::create_dir_all(path).map_err(|source| {
        error!("Could not create {} directory {:?}, exiting", kind, path);
        ToolError::Directory {
            kind,
            path: path.to_path_buf(),
            source,
        }
    })
}
