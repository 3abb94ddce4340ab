//! Restic argument vectors and container mount tables

use crate::config::{OptionScope, ResolvedConfig};
use crate::utils::runtime::{ExecutionRequest, Mount};
use std::collections::BTreeMap;
use std::path::Path;

/// Cache directory as seen by restic
pub const CACHE_MOUNT: &str = "/cache";

/// Restore target as seen by restic
pub const TARGET_MOUNT: &str = "/target";

/// One restic invocation inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation<'a> {
    /// Bare restic with the pass-through arguments
    Run,
    /// `cat config`, used to probe the repository
    Exists,
    Snapshots,
    Restore { snapshot: &'a str, directory: &'a Path },
    BackupVolume { name: &'a str },
    BackupLocalDir { tag: &'a str, path: &'a str },
    Forget,
    Prune,
    /// Latest snapshot per path as JSON, for metrics
    LatestSnapshots,
}

/// Builds container requests from the configuration and the tool settings
pub struct CommandSynthesizer<'a> {
    config: &'a ResolvedConfig,
    cache_directory: &'a Path,
    restic_arguments: &'a [String],
    quiet: bool,
}

impl<'a> CommandSynthesizer<'a> {
    pub fn new(
        config: &'a ResolvedConfig,
        cache_directory: &'a Path,
        restic_arguments: &'a [String],
        quiet: bool,
    ) -> Self {
        Self {
            config,
            cache_directory,
            restic_arguments,
            quiet,
        }
    }

    /// Restic argument vector for an invocation
    pub fn arguments(&self, invocation: &Invocation<'_>) -> Vec<String> {
        let mut args = vec!["--cache-dir".to_string(), CACHE_MOUNT.to_string()];
        let config = self.config;

        match *invocation {
            Invocation::Run => {
                args.extend(config.get_options(OptionScope::Common));
            }
            Invocation::Exists => {
                args.extend(["cat".to_string(), "config".to_string()]);
                args.extend(config.get_options(OptionScope::Common));
            }
            Invocation::Snapshots => {
                args.push("snapshots".to_string());
                args.extend(config.get_options(OptionScope::Common));
            }
            Invocation::Restore { snapshot, .. } => {
                args.extend([
                    "restore".to_string(),
                    snapshot.to_string(),
                    "--target".to_string(),
                    TARGET_MOUNT.to_string(),
                ]);
                args.extend(config.get_options(OptionScope::Common));
            }
            Invocation::BackupVolume { name } => {
                args.extend(config.get_options(OptionScope::Volume(name)));
                args.extend(["--host".to_string(), config.hostname.clone()]);
                args.push("backup".to_string());
                args.push(format!("/volume/{}", name));
            }
            Invocation::BackupLocalDir { tag, .. } => {
                args.extend(config.get_options(OptionScope::LocalDir(tag)));
                args.extend(["--host".to_string(), config.hostname.clone()]);
                args.push("backup".to_string());
                args.push(format!("/localdir/{}", tag));
            }
            Invocation::Forget => {
                args.extend(config.get_options(OptionScope::Forget));
                args.push("forget".to_string());
            }
            Invocation::Prune => {
                args.extend(config.get_options(OptionScope::Forget));
                args.push("prune".to_string());
            }
            Invocation::LatestSnapshots => {
                args.extend(config.get_options(OptionScope::Common));
                args.extend([
                    "snapshots".to_string(),
                    "--json".to_string(),
                    "--latest".to_string(),
                    "1".to_string(),
                    "--host".to_string(),
                    config.hostname.clone(),
                ]);
                // Output is parsed, so nothing else may be appended
                return args;
            }
        }

        args.extend(self.restic_arguments.iter().cloned());

        if self.quiet {
            args.push("-q".to_string());
        }

        args
    }

    /// Mount table for an invocation; the cache is always mounted
    pub fn mounts(&self, invocation: &Invocation<'_>) -> BTreeMap<String, Mount> {
        let mut mounts = BTreeMap::new();

        mounts.insert(
            self.cache_directory.display().to_string(),
            Mount::read_write(CACHE_MOUNT),
        );

        match *invocation {
            Invocation::BackupVolume { name } => {
                mounts.insert(name.to_string(), Mount::read_write(format!("/volume/{}", name)));
            }
            Invocation::BackupLocalDir { tag, path } => {
                mounts.insert(path.to_string(), Mount::read_write(format!("/localdir/{}", tag)));
            }
            Invocation::Restore { directory, .. } => {
                mounts.insert(directory.display().to_string(), Mount::read_write(TARGET_MOUNT));
            }
            _ => {}
        }

        mounts
    }

    /// Complete container request for an invocation
    pub fn request(
        &self,
        image: &str,
        invocation: &Invocation<'_>,
        extra_hosts: &BTreeMap<String, String>,
    ) -> ExecutionRequest {
        ExecutionRequest {
            image: image.to_string(),
            command: self.arguments(invocation),
            env: self.config.environment_vars.clone(),
            mounts: self.mounts(invocation),
            extra_hosts: extra_hosts.clone(),
        }
    }
}
