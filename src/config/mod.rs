//! Configuration module for restictool
//!
//! This module loads the YAML configuration, validates it against the fixed
//! schema and derives everything the container invocations need.
//!
//! ## Derivation
//!
//! 1. `authentication` and `extra` are merged into the environment (`extra` wins)
//! 2. Keys reserved by the tool are rejected
//! 3. `RESTIC_REPOSITORY` and `RESTIC_PASSWORD` are injected
//! 4. The host name, volume selection and local directories are resolved
//!
//! ## Example Usage
//!
//! ```no_run
//! use restictool::config::{self, OptionScope};
//!
//! let config = config::load_config("restictool.yml")?;
//! println!("Backing up as {}", config.hostname);
//! println!("Options: {:?}", config.get_options(OptionScope::Volume("my_volume")));
//! # Ok::<(), restictool::config::ConfigError>(())
//! ```

mod loader;
mod options;
mod types;
mod validator;

pub use loader::{
    load_config, ConfigError, ConfigResolver, ResolvedConfig, Result, ENV_PREFIX,
    FORBIDDEN_ENV_VARS, METRICS_FILE_NAME,
};
pub use types::*;
pub use validator::validate;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
