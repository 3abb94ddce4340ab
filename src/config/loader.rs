use super::types::*;
use super::validator::validate;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Namespace of the environment variables understood by restic
pub const ENV_PREFIX: &str = "RESTIC_";

/// Environment variables the tool sets itself and which the configuration
/// must not provide through `authentication` or `extra`
pub const FORBIDDEN_ENV_VARS: &[&str] = &[
    "RESTIC_REPOSITORY",
    "RESTIC_REPOSITORY_FILE",
    "RESTIC_PASSWORD",
    "RESTIC_PASSWORD_FILE",
    "RESTIC_PASSWORD_COMMAND",
    "RESTIC_CACHE_DIR",
    "TMPDIR",
];

/// Name of the metrics file written into `metrics.directory`
pub const METRICS_FILE_NAME: &str = "restictool.prom";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("configuration invalid: {path}: {reason}")]
    ValidationError { path: String, reason: String },

    #[error("configuration invalid: {0} cannot be set in the configuration")]
    ForbiddenVariable(String),

    #[error("repository.host not set and the system host name is unavailable: {0}")]
    Hostname(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration after validation and derivation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub config: Config,

    /// Host name passed to `restic backup --host`
    pub hostname: String,

    /// Environment of every restic container
    pub environment_vars: BTreeMap<String, String>,

    /// Explicitly named volumes; empty when the wildcard is present
    pub volumes_to_backup: Vec<String>,
    pub backup_all_volumes: bool,

    /// `(tag, resolved path)` pairs in declaration order
    pub localdirs_to_backup: Vec<(String, String)>,
}

type HostnameSource<'a> = Box<dyn Fn() -> std::result::Result<String, String> + 'a>;

/// Turns a validated [`Config`] into a [`ResolvedConfig`]
pub struct ConfigResolver<'a> {
    forbidden_env_vars: &'a [&'a str],
    system_hostname: HostnameSource<'a>,
}

impl Default for ConfigResolver<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver<'static> {
    /// Resolver using the built-in forbidden variables and the system host name
    pub fn new() -> Self {
        Self {
            forbidden_env_vars: FORBIDDEN_ENV_VARS,
            system_hostname: Box::new(system_hostname),
        }
    }
}

impl<'a> ConfigResolver<'a> {
    /// Replace the forbidden environment variable table
    pub fn with_forbidden_env_vars(mut self, forbidden: &'a [&'a str]) -> Self {
        self.forbidden_env_vars = forbidden;
        self
    }

    /// Use a fixed value instead of querying the system host name
    pub fn with_system_hostname(mut self, hostname: &str) -> Self {
        let hostname = hostname.to_string();
        self.system_hostname = Box::new(move || Ok(hostname.clone()));
        self
    }

    /// Parse, validate and resolve a YAML document
    pub fn resolve_str(&self, document: &str) -> Result<ResolvedConfig> {
        let value: serde_yaml::Value = serde_yaml::from_str(document)?;
        let config = validate(&value)?;
        self.resolve(config)
    }

    /// Read the whole stream, then resolve it
    pub fn resolve_reader<R: Read>(&self, mut reader: R) -> Result<ResolvedConfig> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        self.resolve_str(&document)
    }

    /// Derive hostname, environment and backup selection from a configuration
    pub fn resolve(&self, config: Config) -> Result<ResolvedConfig> {
        let repository = &config.repository;

        // `extra` wins over `authentication` on collision
        let mut environment_vars: BTreeMap<String, String> = repository
            .authentication
            .iter()
            .chain(repository.extra.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(key) = environment_vars
            .keys()
            .find(|k| self.forbidden_env_vars.contains(&k.as_str()))
        {
            return Err(ConfigError::ForbiddenVariable(key.clone()));
        }

        environment_vars.insert(
            format!("{}REPOSITORY", ENV_PREFIX),
            repository.location.clone(),
        );
        environment_vars.insert(format!("{}PASSWORD", ENV_PREFIX), repository.password.clone());

        let hostname = match &repository.host {
            Some(host) => host.clone(),
            None => (self.system_hostname)()
                .map_err(ConfigError::Hostname)?
                .to_lowercase(),
        };

        let mut volumes_to_backup = Vec::new();
        let mut backup_all_volumes = false;
        for volume in &config.volumes {
            if volume.name == "*" {
                volumes_to_backup.clear();
                backup_all_volumes = true;
                break;
            }
            volumes_to_backup.push(volume.name.clone());
        }

        let localdirs_to_backup = config
            .localdirs
            .iter()
            .enumerate()
            .map(|(i, dir)| {
                let path = resolve_path(&dir.path).map_err(|e| ConfigError::ValidationError {
                    path: format!("localdirs[{}].path", i),
                    reason: e.to_string(),
                })?;
                Ok((dir.name.clone(), path.display().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Resolved configuration: host '{}', {} volume(s){}, {} local director(ies)",
            hostname,
            volumes_to_backup.len(),
            if backup_all_volumes { " plus wildcard" } else { "" },
            localdirs_to_backup.len()
        );

        Ok(ResolvedConfig {
            config,
            hostname,
            environment_vars,
            volumes_to_backup,
            backup_all_volumes,
            localdirs_to_backup,
        })
    }
}

/// Load and resolve a configuration file with the default resolver
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ResolvedConfig> {
    let contents = fs::read_to_string(path)?;
    ConfigResolver::new().resolve_str(&contents)
}

fn system_hostname() -> std::result::Result<String, String> {
    hostname::get()
        .map_err(|e| e.to_string())?
        .into_string()
        .map_err(|_| "host name is not valid UTF-8".to_string())
}

/// Expand `~` and make the path absolute
fn resolve_path(path: &str) -> std::io::Result<PathBuf> {
    let expanded = super::expand_tilde(Path::new(path));
    std::path::absolute(expanded)
}

fn anonymous_volume_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[0-9a-fA-F]{48,}$").expect("static pattern compiles"))
}

impl ResolvedConfig {
    /// Whether a volume from the live inventory should be backed up
    pub fn is_volume_backed_up(&self, name: &str) -> bool {
        if self.backup_all_volumes {
            !anonymous_volume_pattern().is_match(name)
        } else {
            self.volumes_to_backup.iter().any(|v| v == name)
        }
    }

    pub fn repository_location(&self) -> &str {
        &self.config.repository.location
    }

    /// Whether a retention policy is configured
    pub fn is_forget_specified(&self) -> bool {
        self.config.options.forget.is_some()
    }

    /// Metrics file location, when metrics are configured
    pub fn metrics_path(&self) -> Option<PathBuf> {
        self.config
            .metrics
            .as_ref()
            .map(|m| super::expand_tilde(Path::new(&m.directory)).join(METRICS_FILE_NAME))
    }

    /// Whether the configured metrics directory exists
    pub fn metrics_dir_exists(&self) -> bool {
        self.config
            .metrics
            .as_ref()
            .map(|m| super::expand_tilde(Path::new(&m.directory)).is_dir())
            .unwrap_or(false)
    }
}
