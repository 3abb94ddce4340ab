//! Tool settings, independent of how they were obtained

use std::path::{Path, PathBuf};

pub const DEFAULT_IMAGE: &str = "restic/restic";

/// Operator intent for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubCommand {
    /// Validate the configuration only
    Check,
    /// Run restic with the pass-through arguments
    Run,
    /// Back up the configured volumes and local directories
    Backup { prune: bool },
    /// Restore a snapshot into a host directory
    Restore { directory: PathBuf, snapshot: String },
    /// List the snapshots of the repository
    Snapshots,
    /// Check whether the repository exists and is reachable
    Exists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub subcommand: SubCommand,

    /// Restic image reference
    pub image: String,

    /// Pull the image before running
    pub force_pull: bool,

    /// Host directory mounted as the restic cache
    pub cache_directory: PathBuf,

    /// Append `-q` to every restic invocation
    pub quiet: bool,

    /// Extra arguments passed verbatim to restic
    pub restic_arguments: Vec<String>,
}

impl Settings {
    pub fn new(subcommand: SubCommand) -> Self {
        Self {
            subcommand,
            image: DEFAULT_IMAGE.to_string(),
            force_pull: false,
            cache_directory: default_cache_directory(),
            quiet: false,
            restic_arguments: Vec::new(),
        }
    }

    /// Expand `~` in the cache and restore directories and make them absolute.
    ///
    /// Docker binds only absolute host paths; a relative one names a volume.
    pub fn make_paths_absolute(&mut self) {
        self.cache_directory = absolute_directory(&self.cache_directory);

        if let SubCommand::Restore { directory, .. } = &mut self.subcommand {
            *directory = absolute_directory(directory);
        }
    }
}

fn absolute_directory(path: &Path) -> PathBuf {
    let expanded = crate::config::expand_tilde(path);
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// `~/.config/restictool/restictool.yml`
pub fn default_configuration_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("restictool")
        .join("restictool.yml")
}

/// `~/.cache/restic`
pub fn default_cache_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("restic")
}
