//! Tests for the 'backup' command
//!
//! The backup command runs one container per volume and local directory,
//! then the retention phase and finally the metrics export.

use test_utils::{
    anonymous_volume, compose_volumes, sample_snapshots_json, ConfigBuilder, MockRuntime,
    OptionAssertions, ResultAssertions, RuntimeCall, SubCommand, TestContext,
};

fn backup() -> SubCommand {
    SubCommand::Backup { prune: false }
}

#[test]
fn test_backup_named_volumes_sorted() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_volume("nextcloud_redis")
            .add_volume("nextcloud_db")
            .add_volume("not_present"),
    );
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(backup(), mock);

    let report = tool.run().assert_ok();
    let summary = report.backup.assert_some();

    assert_eq!(summary.resources, vec!["nextcloud_db", "nextcloud_redis"]);
    assert_eq!(summary.max_exit_code, 0);

    let commands = tool.runtime().commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(
        commands[0],
        vec![
            "--cache-dir",
            "/cache",
            "--host",
            "test-host",
            "backup",
            "/volume/nextcloud_db",
        ]
    );
}

#[test]
fn test_wildcard_skips_anonymous_volumes() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_all_volumes());
    let mut volumes = compose_volumes();
    volumes.push(anonymous_volume());
    let mock = MockRuntime::new().with_volumes(volumes);
    let mut tool = ctx.tool(backup(), mock);

    let summary = tool.run().assert_ok().backup.assert_some();

    assert_eq!(summary.resources, compose_volumes());
}

#[test]
fn test_volume_mounts_and_environment() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_extra("RESTIC_COMPRESSION", "max")
            .add_volume("nextcloud_db"),
    );
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(backup(), mock);

    tool.run().assert_ok();

    let request = &tool.runtime().runs()[0];
    let cache = ctx.cache_dir().display().to_string();
    assert_eq!(request.mounts.len(), 2);
    assert_eq!(request.mounts[&cache].bind, "/cache");
    assert_eq!(request.mounts["nextcloud_db"].bind, "/volume/nextcloud_db");
    assert_eq!(request.env["RESTIC_COMPRESSION"], "max");
    assert_eq!(request.env["RESTIC_PASSWORD"], "test-password-123");
    assert!(request.env["RESTIC_REPOSITORY"].ends_with("repository"));
    assert!(ctx.cache_dir().is_dir());
}

#[test]
fn test_localdirs_follow_volumes_in_declared_order() {
    let builder = ConfigBuilder::minimal()
        .add_temp_localdir("zzz")
        .add_temp_localdir("aaa")
        .add_volume("nextcloud_html");
    let ctx = TestContext::from_builder(builder);
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(backup(), mock);

    tool.run().assert_ok();

    let runs = tool.runtime().runs();
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0].command.last().assert_some(), "/volume/nextcloud_html");
    assert_eq!(runs[1].command.last().assert_some(), "/localdir/zzz");
    assert_eq!(runs[2].command.last().assert_some(), "/localdir/aaa");

    let zzz = ctx.temp_dir().join("localdirs").join("zzz");
    assert_eq!(runs[1].mounts[&zzz.display().to_string()].bind, "/localdir/zzz");
}

#[test]
fn test_nothing_to_back_up() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_volume("absent")
            .with_forget_options(&["--keep-last", "3"])
            .with_metrics(),
    );
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(SubCommand::Backup { prune: true }, mock);

    let summary = tool.run().assert_ok().backup.assert_some();

    assert!(summary.resources.is_empty());
    assert!(!summary.metrics_written);
    assert!(tool.runtime().runs().is_empty());
}

#[test]
fn test_forget_and_prune() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_common_options(&["--insecure-tls"])
            .with_forget_options(&["--keep-daily", "7"])
            .add_volume("nextcloud_db"),
    );
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(SubCommand::Backup { prune: true }, mock);

    tool.run().assert_ok();

    let commands = tool.runtime().commands();
    assert_eq!(commands.len(), 3);
    assert_eq!(
        commands[1],
        vec!["--cache-dir", "/cache", "--keep-daily", "7", "forget"]
    );
    assert_eq!(
        commands[2],
        vec!["--cache-dir", "/cache", "--keep-daily", "7", "prune"]
    );
}

#[test]
fn test_no_forget_without_retention_options() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_volume("nextcloud_db"));
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(SubCommand::Backup { prune: true }, mock);

    tool.run().assert_ok();

    assert_eq!(tool.runtime().commands().len(), 1);
}

#[test]
fn test_failures_are_aggregated_not_fatal() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_forget_options(&["--keep-last", "1"])
            .add_all_volumes(),
    );
    let mock = MockRuntime::new()
        .with_volumes(compose_volumes())
        .with_exit_codes(vec![0, 3, 0, 1, 11]);
    let mut tool = ctx.tool(SubCommand::Backup { prune: true }, mock);

    let summary = tool.run().assert_ok().backup.assert_some();

    assert_eq!(summary.resources.len(), 3);
    assert_eq!(summary.max_exit_code, 11);
    assert_eq!(tool.runtime().runs().len(), 5);
}

#[test]
fn test_pass_through_and_quiet() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_forget_options(&["--keep-last", "1"])
            .add_volume("nextcloud_db"),
    );
    let mut settings = ctx.settings(backup());
    settings.quiet = true;
    settings.restic_arguments = vec!["--dry-run".to_string()];
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool_with_settings(settings, mock);

    tool.run().assert_ok();

    let commands = tool.runtime().commands();
    assert_eq!(&commands[0][4..], ["backup", "/volume/nextcloud_db", "--dry-run", "-q"]);
    assert_eq!(&commands[1][2..], ["--keep-last", "1", "forget", "--dry-run", "-q"]);
}

#[test]
fn test_metrics_written() {
    let builder = ConfigBuilder::minimal()
        .add_volume("nextcloud_db")
        .with_metrics();
    let ctx = TestContext::from_builder(builder);
    let mock = MockRuntime::new()
        .with_volumes(compose_volumes())
        .with_output(vec!["Files: 10 new".to_string()])
        .with_output(vec![sample_snapshots_json()]);
    let mut tool = ctx.tool(backup(), mock);

    let summary = tool.run().assert_ok().backup.assert_some();
    assert!(summary.metrics_written);

    let commands = tool.runtime().commands();
    assert_eq!(
        commands[1],
        vec![
            "--cache-dir",
            "/cache",
            "snapshots",
            "--json",
            "--latest",
            "1",
            "--host",
            "test-host",
        ]
    );

    let contents = ctx.read_file("metrics/restictool.prom").assert_ok();
    assert_eq!(contents.lines().count(), 19);
    assert!(contents.contains("restictool_backup_size_bytes{hostname=\"mbair\""));
}

#[test]
fn test_metrics_directory_missing() {
    let builder = ConfigBuilder::minimal().add_volume("nextcloud_db");
    let missing = builder.temp_dir().join("no-such-dir");
    let ctx = TestContext::from_builder(builder.with_metrics_dir(&missing));
    let mock = MockRuntime::new().with_volumes(compose_volumes());
    let mut tool = ctx.tool(backup(), mock);

    let summary = tool.run().assert_ok().backup.assert_some();

    assert!(!summary.metrics_written);
    assert_eq!(tool.runtime().runs().len(), 1);
    assert!(!missing.exists());
}

#[test]
fn test_metrics_garbage_output_only_warns() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .add_volume("nextcloud_db")
            .with_metrics(),
    );
    let mock = MockRuntime::new()
        .with_volumes(compose_volumes())
        .with_output(vec![])
        .with_output(vec!["Fatal: unable to open repository".to_string()]);
    let mut tool = ctx.tool(backup(), mock);

    let summary = tool.run().assert_ok().backup.assert_some();

    assert!(!summary.metrics_written);
    assert!(!ctx.file_exists("metrics/restictool.prom"));
}

#[test]
fn test_force_pull_uses_full_reference() {
    let ctx = TestContext::with_minimal_config();
    let mut settings = ctx.settings(backup());
    settings.force_pull = true;
    settings.image = "restic/restic:0.17.3".to_string();
    let mut tool = ctx.tool_with_settings(settings, MockRuntime::new());

    tool.run().assert_ok();

    assert_eq!(
        tool.runtime().get_calls()[0],
        RuntimeCall::PullImage {
            image: "restic/restic:0.17.3".to_string()
        }
    );
}

#[test]
fn test_volume_listing_failure() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_all_volumes());
    let mock = MockRuntime::new().with_failing_list();
    let mut tool = ctx.tool(backup(), mock);

    let err = tool.run().unwrap_err();
    assert_eq!(err.exit_code(), 1);
}
