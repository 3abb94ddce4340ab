//! Tests for the 'check' command
//!
//! Check only validates the configuration; it never reaches the container runtime.

use test_utils::{ConfigBuilder, MockRuntime, ResultAssertions, RunReport, SubCommand, TestContext};

#[test]
fn test_check_valid_config() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_all_volumes().with_metrics());
    let mut tool = ctx.tool(SubCommand::Check, MockRuntime::new().with_failing_network());

    assert_eq!(tool.run().assert_ok(), RunReport::default());
    assert!(tool.runtime().get_calls().is_empty());
}

#[test]
fn test_check_creates_no_directories() {
    let ctx = TestContext::with_minimal_config();
    let mut tool = ctx.tool(SubCommand::Check, MockRuntime::new());

    tool.run().assert_ok();

    assert!(!ctx.cache_dir().exists());
}

#[test]
fn test_check_ignores_force_pull() {
    let ctx = TestContext::with_minimal_config();
    let mut settings = ctx.settings(SubCommand::Check);
    settings.force_pull = true;
    let mut tool = ctx.tool_with_settings(settings, MockRuntime::new());

    tool.run().assert_ok();

    assert!(!tool.runtime().pull_called());
}
