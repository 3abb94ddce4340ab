//! Option merging tests

use test_utils::{ConfigBuilder, ConfigResolver, OptionScope, ResolvedConfig};

fn resolve(builder: ConfigBuilder) -> ResolvedConfig {
    ConfigResolver::new().resolve(builder.build()).unwrap()
}

#[test]
fn test_common_precedes_resource_options() {
    let config = resolve(
        ConfigBuilder::minimal()
            .with_common_options(&["--insecure-tls"])
            .with_volume_options(&["--one-file-system"])
            .with_localdir_options(&["--exclude-caches"])
            .add_volume_with_options("data", &["--exclude", "tmp"]),
    );

    assert_eq!(
        config.get_options(OptionScope::Volume("data")),
        vec!["--insecure-tls", "--one-file-system", "--exclude", "tmp"]
    );
    assert_eq!(
        config.get_options(OptionScope::LocalDir("etc")),
        vec!["--insecure-tls", "--exclude-caches"]
    );
    assert_eq!(config.get_options(OptionScope::Common), vec!["--insecure-tls"]);
}

#[test]
fn test_exact_volume_beats_wildcard() {
    let config = resolve(
        ConfigBuilder::minimal()
            .add_volume_with_options("*", &["--wildcard"])
            .add_volume_with_options("data", &["--exact"]),
    );

    assert_eq!(config.get_options(OptionScope::Volume("data")), vec!["--exact"]);
    assert_eq!(config.get_options(OptionScope::Volume("other")), vec!["--wildcard"]);
}

#[test]
fn test_forget_scope_is_disjoint() {
    let config = resolve(
        ConfigBuilder::minimal()
            .with_common_options(&["--insecure-tls"])
            .with_volume_options(&["--one-file-system"])
            .with_forget_options(&["--keep-daily", "7", "--prune"]),
    );

    assert_eq!(
        config.get_options(OptionScope::Forget),
        vec!["--keep-daily", "7", "--prune"]
    );
    assert!(config.is_forget_specified());
}

#[test]
fn test_no_options_configured() {
    let config = resolve(ConfigBuilder::minimal().add_volume("data"));

    assert!(config.get_options(OptionScope::Common).is_empty());
    assert!(config.get_options(OptionScope::Volume("data")).is_empty());
    assert!(config.get_options(OptionScope::Forget).is_empty());
    assert!(!config.is_forget_specified());
}

#[test]
fn test_localdir_entry_options() {
    let builder = ConfigBuilder::minimal();
    let path = builder.temp_dir().to_path_buf();
    let config = resolve(
        builder
            .with_localdir_options(&["--tag", "local"])
            .add_localdir_with_options("home", &path, &["--exclude", ".cache"]),
    );

    assert_eq!(
        config.get_options(OptionScope::LocalDir("home")),
        vec!["--tag", "local", "--exclude", ".cache"]
    );
}

#[test]
fn test_duplicates_are_kept() {
    let config = resolve(
        ConfigBuilder::minimal()
            .with_common_options(&["--verbose"])
            .with_volume_options(&["--verbose"])
            .add_volume_with_options("data", &["--verbose"]),
    );

    assert_eq!(
        config.get_options(OptionScope::Volume("data")),
        vec!["--verbose", "--verbose", "--verbose"]
    );
}
