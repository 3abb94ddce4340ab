//! Configuration loading and resolution tests

use rstest::rstest;
use test_utils::{ConfigBuilder, ConfigError, ConfigResolver, ResultAssertions, TestContext};

#[test]
fn test_builder_config_resolves() {
    let resolved = ConfigResolver::new()
        .resolve(
            ConfigBuilder::minimal()
                .add_volume("data")
                .add_volume("db")
                .build(),
        )
        .assert_ok();

    assert_eq!(resolved.hostname, "test-host");
    assert_eq!(resolved.volumes_to_backup, vec!["data", "db"]);
    assert!(!resolved.backup_all_volumes);
    assert_eq!(resolved.environment_vars["RESTIC_PASSWORD"], "test-password-123");
}

#[test]
fn test_load_config_from_file() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::minimal()
            .with_authentication("AWS_ACCESS_KEY_ID", "key")
            .with_extra("RESTIC_PACK_SIZE", "64")
            .add_temp_localdir("etc"),
    );
    let path = ctx.write_config();

    let resolved = restictool::config::load_config(&path).assert_ok();

    assert_eq!(resolved.environment_vars["AWS_ACCESS_KEY_ID"], "key");
    assert_eq!(resolved.environment_vars["RESTIC_PACK_SIZE"], "64");
    assert_eq!(resolved.localdirs_to_backup.len(), 1);
    assert_eq!(resolved.localdirs_to_backup[0].0, "etc");
}

#[test]
fn test_missing_file() {
    let ctx = TestContext::new();
    let result = restictool::config::load_config(ctx.temp_dir().join("absent.yml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_unparsable_document() {
    let result = ConfigResolver::new().resolve_str("repository: [unclosed");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[rstest]
#[case("", "configuration")]
#[case("options: {}\n", "repository")]
#[case("repository:\n  password: pw\n", "repository.location")]
#[case("repository:\n  location: /r\n", "repository.password")]
#[case("repository:\n  location: \"\"\n  password: pw\n", "repository.location")]
#[case("repository:\n  location: /r\n  password: pw\n  host: \"\"\n", "repository.host")]
#[case(
    "repository:\n  location: /r\n  password: pw\nvolumes:\n  - options: [-x]\n",
    "volumes[0].name"
)]
#[case(
    "repository:\n  location: /r\n  password: pw\nlocaldirs:\n  - name: etc\n",
    "localdirs[0].path"
)]
#[case(
    "repository:\n  location: /r\n  password: pw\noptions:\n  common: --one\n",
    "options.common"
)]
#[case("repository:\n  location: /r\n  password: pw\nmetrics: {}\n", "metrics.directory")]
fn test_invalid_documents_name_the_field(#[case] document: &str, #[case] field: &str) {
    ConfigResolver::new()
        .with_system_hostname("h")
        .resolve_str(document)
        .assert_err_contains(field);
}

#[rstest]
#[case("RESTIC_REPOSITORY")]
#[case("RESTIC_PASSWORD")]
#[case("RESTIC_PASSWORD_FILE")]
#[case("RESTIC_CACHE_DIR")]
#[case("TMPDIR")]
fn test_forbidden_variables(#[case] key: &str) {
    let from_authentication = ConfigBuilder::minimal().with_authentication(key, "x").build();
    let from_extra = ConfigBuilder::minimal().with_extra(key, "x").build();

    for config in [from_authentication, from_extra] {
        match ConfigResolver::new().resolve(config) {
            Err(ConfigError::ForbiddenVariable(name)) => assert_eq!(name, key),
            other => panic!("Expected forbidden variable error, got {:?}", other),
        }
    }
}

#[test]
fn test_custom_forbidden_table() {
    const FORBIDDEN: &[&str] = &["AWS_PROFILE"];
    let config = ConfigBuilder::minimal()
        .with_authentication("AWS_PROFILE", "prod")
        .build();

    ConfigResolver::new()
        .with_forbidden_env_vars(FORBIDDEN)
        .resolve(config)
        .assert_err_contains("AWS_PROFILE");
}

#[test]
fn test_system_hostname_lowercased() {
    let config = ConfigBuilder::minimal().with_host(None).build();

    let resolved = ConfigResolver::new()
        .with_system_hostname("BuildHost")
        .resolve(config)
        .assert_ok();

    assert_eq!(resolved.hostname, "buildhost");
}

#[test]
fn test_wildcard_volume_selection() {
    let resolved = ConfigResolver::new()
        .resolve(
            ConfigBuilder::minimal()
                .add_volume("data")
                .add_all_volumes()
                .add_volume("late")
                .build(),
        )
        .assert_ok();

    assert!(resolved.backup_all_volumes);
    assert!(resolved.volumes_to_backup.is_empty());
    assert!(resolved.is_volume_backed_up("anything"));
    assert!(!resolved.is_volume_backed_up(&test_utils::anonymous_volume()));
}

#[test]
fn test_metrics_path() {
    let builder = ConfigBuilder::minimal().with_metrics();
    let expected = builder.metrics_dir().join("restictool.prom");
    let ctx = TestContext::from_builder(builder);

    let resolved = ctx.resolved();
    assert_eq!(resolved.metrics_path(), Some(expected));
    assert!(resolved.metrics_dir_exists());
}
