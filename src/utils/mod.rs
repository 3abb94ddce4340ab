pub mod command;
pub mod docker;

// Trait-based abstraction for testability
pub mod runtime;

// Re-export commonly used types and traits (used by test crate)
pub use runtime::{ContainerRuntime, DockerRuntime, ExecutionRequest, LogStream, Mount, MountMode};
