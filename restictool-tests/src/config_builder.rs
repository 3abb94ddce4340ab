//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible
//! defaults. The result can be used directly or rendered as a YAML document.

use restictool::config::{Config, LocalDirSpec, MetricsConfig, Repository, VolumeSpec};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with a local repository and a fixed host
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let repository = Repository {
            location: temp_dir.path().join("repository").display().to_string(),
            password: "test-password-123".to_string(),
            host: Some("test-host".to_string()),
            ..Default::default()
        };

        Self {
            temp_dir,
            config: Config {
                repository,
                ..Default::default()
            },
        }
    }

    /// Same as [`ConfigBuilder::new`]; nothing to back up yet
    pub fn minimal() -> Self {
        Self::new()
    }

    /// Set or clear `repository.host`
    pub fn with_host(mut self, host: Option<&str>) -> Self {
        self.config.repository.host = host.map(str::to_string);
        self
    }

    /// Add an `authentication` variable
    pub fn with_authentication(mut self, key: &str, value: &str) -> Self {
        self.config
            .repository
            .authentication
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Add an `extra` variable
    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.config
            .repository
            .extra
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_common_options(mut self, options: &[&str]) -> Self {
        self.config.options.common = Some(strings(options));
        self
    }

    /// Set the retention options, which enables the forget phase
    pub fn with_forget_options(mut self, options: &[&str]) -> Self {
        self.config.options.forget = Some(strings(options));
        self
    }

    pub fn with_volume_options(mut self, options: &[&str]) -> Self {
        self.config.options.volume = Some(strings(options));
        self
    }

    pub fn with_localdir_options(mut self, options: &[&str]) -> Self {
        self.config.options.localdir = Some(strings(options));
        self
    }

    /// Add a volume entry without options
    pub fn add_volume(mut self, name: &str) -> Self {
        self.config.volumes.push(VolumeSpec {
            name: name.to_string(),
            options: None,
        });
        self
    }

    /// Add a volume entry with its own options
    pub fn add_volume_with_options(mut self, name: &str, options: &[&str]) -> Self {
        self.config.volumes.push(VolumeSpec {
            name: name.to_string(),
            options: Some(strings(options)),
        });
        self
    }

    /// Add the `*` entry
    pub fn add_all_volumes(self) -> Self {
        self.add_volume("*")
    }

    /// Add a local directory entry
    pub fn add_localdir(mut self, name: &str, path: &Path) -> Self {
        self.config.localdirs.push(LocalDirSpec {
            name: name.to_string(),
            path: path.display().to_string(),
            options: None,
        });
        self
    }

    /// Add a local directory entry with its own options
    pub fn add_localdir_with_options(mut self, name: &str, path: &Path, options: &[&str]) -> Self {
        self.config.localdirs.push(LocalDirSpec {
            name: name.to_string(),
            path: path.display().to_string(),
            options: Some(strings(options)),
        });
        self
    }

    /// Add a local directory created inside the temp dir
    pub fn add_temp_localdir(self, name: &str) -> Self {
        let path = self.temp_dir.path().join("localdirs").join(name);
        fs::create_dir_all(&path).expect("Failed to create local directory");
        self.add_localdir(name, &path)
    }

    /// Write metrics into the given directory
    pub fn with_metrics_dir(mut self, directory: &Path) -> Self {
        self.config.metrics = Some(MetricsConfig {
            directory: directory.display().to_string(),
        });
        self
    }

    /// Write metrics into an existing directory inside the temp dir
    pub fn with_metrics(self) -> Self {
        let directory = self.metrics_dir();
        fs::create_dir_all(&directory).expect("Failed to create metrics directory");
        self.with_metrics_dir(&directory)
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory used by [`ConfigBuilder::with_metrics`]
    pub fn metrics_dir(&self) -> PathBuf {
        self.temp_dir.path().join("metrics")
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.config
    }

    /// Render the configuration as a YAML document
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.config).expect("Failed to serialize config")
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
