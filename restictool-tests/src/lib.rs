//! Test utilities for restictool
//!
//! This crate provides shared test utilities, the mock container runtime
//! and helper functions for testing the restictool orchestration.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockRuntime, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_volume("data"));
//!     let mock = MockRuntime::new().with_volumes(vec!["data".to_string()]);
//!     let report = ctx.tool(SubCommand::Backup { prune: false }, mock).run();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{CapturedOutput, OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use restictool::config::{
    Config, ConfigError, ConfigResolver, LocalDirSpec, MetricsConfig, OptionScope, Options,
    Repository, ResolvedConfig, VolumeSpec,
};
pub use restictool::error::ToolError;
pub use restictool::managers::tool::{BackupSummary, OutputSink, ResticTool, RunReport};
pub use restictool::settings::{Settings, SubCommand};

// Re-export the mock runtime from the main crate
pub use restictool::utils::runtime::mock::{MockRuntime, RuntimeCall};
pub use restictool::utils::runtime::{ContainerRuntime, ExecutionRequest, LogStream};
