//! restictool library
//!
//! Runs restic in throwaway docker containers to back up docker volumes and
//! local directories, driven by one YAML configuration file.

pub mod config;
pub mod error;
pub mod managers;
pub mod settings;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, ConfigError, ConfigResolver, ResolvedConfig};
pub use error::ToolError;
pub use managers::logging::{init_logging, LogGuard, LoggingConfig};
pub use managers::tool::{BackupSummary, ResticTool, RunReport};
pub use settings::{Settings, SubCommand};
