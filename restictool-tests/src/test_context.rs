//! Test context and harness for orchestrator tests
//!
//! Provides a unified context for setting up and tearing down test environments.

use crate::config_builder::ConfigBuilder;
use anyhow::Result;
use restictool::config::{Config, ConfigResolver, ResolvedConfig};
use restictool::managers::tool::{OutputSink, ResticTool};
use restictool::settings::{Settings, SubCommand};
use restictool::utils::runtime::mock::MockRuntime;
use restictool::utils::runtime::LogStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Option<Config>,
}

impl TestContext {
    /// Create a new test context with a temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            config: None,
        }
    }

    /// Create a test context with a minimal configuration
    pub fn with_minimal_config() -> Self {
        Self::from_builder(ConfigBuilder::minimal())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config: Some(config),
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve the configuration with the default resolver
    pub fn resolved(&self) -> ResolvedConfig {
        let config = self.config.clone().expect("Context has no configuration");
        ConfigResolver::new()
            .resolve(config)
            .expect("Failed to resolve configuration")
    }

    /// Cache directory handed to the tool (not created up front)
    pub fn cache_dir(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// Settings for a subcommand with the cache inside the temp dir
    pub fn settings(&self, subcommand: SubCommand) -> Settings {
        let mut settings = Settings::new(subcommand);
        settings.cache_directory = self.cache_dir();
        settings
    }

    /// Orchestrator over the mock runtime
    pub fn tool(&self, subcommand: SubCommand, runtime: MockRuntime) -> ResticTool<MockRuntime> {
        ResticTool::new(self.settings(subcommand), self.resolved(), runtime)
    }

    /// Orchestrator with customized settings
    pub fn tool_with_settings(&self, settings: Settings, runtime: MockRuntime) -> ResticTool<MockRuntime> {
        ResticTool::new(settings, self.resolved(), runtime)
    }

    /// Write the configuration as YAML and return its path
    pub fn write_config(&self) -> PathBuf {
        let config = self.config.as_ref().expect("Context has no configuration");
        let yaml = serde_yaml::to_string(config).expect("Failed to serialize config");
        self.create_file("restictool.yml", &yaml)
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Check if a file exists in the temp directory
    pub fn file_exists(&self, name: &str) -> bool {
        self.temp_dir.path().join(name).exists()
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Output sink recording the container lines the tool forwards
#[derive(Clone, Default)]
pub struct CapturedOutput {
    lines: Arc<Mutex<Vec<(LogStream, String)>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwarded lines in arrival order
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Forwarded lines of one stream
    pub fn stream(&self, wanted: LogStream) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(stream, _)| *stream == wanted)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl OutputSink for CapturedOutput {
    fn line(&self, stream: LogStream, line: &str) {
        self.lines.lock().unwrap().push((stream, line.to_string()));
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display + std::fmt::Debug> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}

/// Extension trait for Option assertions
pub trait OptionAssertions<T> {
    /// Assert that the option is Some and return the value
    fn assert_some(self) -> T;

    /// Assert that the option is None
    fn assert_none(self);
}

impl<T: std::fmt::Debug> OptionAssertions<T> for Option<T> {
    fn assert_some(self) -> T {
        match self {
            Some(v) => v,
            None => panic!("Expected Some, got None"),
        }
    }

    fn assert_none(self) {
        if let Some(v) = self {
            panic!("Expected None, got Some: {:?}", v);
        }
    }
}
