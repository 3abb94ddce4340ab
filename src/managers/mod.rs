pub mod arguments;
pub mod logging;
pub mod metrics;
pub mod tool;
