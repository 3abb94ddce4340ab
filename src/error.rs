use crate::config::ConfigError;
use std::path::PathBuf;

/// Exit code for configuration and directory errors
pub const FATAL_EXIT_CODE: u8 = 16;

/// Exit code when the container runtime itself fails
pub const RUNTIME_EXIT_CODE: u8 = 1;

/// Errors that end an invocation
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not create {kind} directory {path:?}: {source}")]
    Directory {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("restic exited with code {code}")]
    EngineExecution { code: i32 },

    #[error("Container runtime failure: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

impl ToolError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Config(_) | ToolError::Directory { .. } => FATAL_EXIT_CODE,
            ToolError::EngineExecution { code } => u8::try_from(*code)
                .ok()
                .filter(|c| *c != 0)
                .unwrap_or(RUNTIME_EXIT_CODE),
            ToolError::Runtime(_) => RUNTIME_EXIT_CODE,
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
