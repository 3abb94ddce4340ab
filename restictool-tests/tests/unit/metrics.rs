//! Metrics format tests

use restictool::managers::metrics::{self, MetricSample, SnapshotRecord};
use test_utils::{snapshot_json, SNAPSHOT_WITHOUT_SUMMARY, SNAPSHOT_WITH_SUMMARY};

const REPOSITORY: &str = "sftp:backup@nas:/restic";

fn record(json: &str) -> SnapshotRecord {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_line_counts() {
    let limited = MetricSample::from_snapshot(REPOSITORY, &record(SNAPSHOT_WITHOUT_SUMMARY)).unwrap();
    let full = MetricSample::from_snapshot(REPOSITORY, &record(SNAPSHOT_WITH_SUMMARY)).unwrap();

    assert_eq!(limited.metric_lines().lines().count(), 1);
    assert_eq!(full.metric_lines().lines().count(), 4);
}

#[test]
fn test_labels_in_order() {
    let sample = MetricSample::from_snapshot(REPOSITORY, &record(SNAPSHOT_WITHOUT_SUMMARY)).unwrap();

    assert_eq!(
        sample.metric_lines().trim_end(),
        "restictool_backup_timestamp_seconds{hostname=\"mbair\",repository=\"sftp:backup@nas:/restic\",path=\"/volume/vscode\"} 1733832700"
    );
}

#[test]
fn test_escaping_alters_nothing_else() {
    let json = snapshot_json("host", "/localdir/a\"b\nc\\d", "2024-12-10T19:43:56Z");
    let sample = MetricSample::from_snapshot(REPOSITORY, &record(&json)).unwrap();

    let text = sample.metric_lines();
    assert!(text.contains(r#"path="/localdir/a\"b\nc\\d""#));
    assert!(text.ends_with(" 1733859836\n"));
}

#[test]
fn test_fractional_time_keeps_microseconds() {
    let ts = metrics::time_string_to_timestamp("2024-12-10T19:43:56.000001999Z").unwrap();
    assert!((ts - 1733859836.000001).abs() < 1e-6);

    let offset = metrics::time_string_to_timestamp("2024-12-10T20:43:56+01:00").unwrap();
    assert_eq!(offset, 1733859836.0);
}

#[test]
fn test_render_layout() {
    let records = vec![record(SNAPSHOT_WITH_SUMMARY), record(SNAPSHOT_WITHOUT_SUMMARY)];
    let text = metrics::render(REPOSITORY, &records).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // 12 header lines, 4 + 1 full sample, 1 + 1 limited sample
    assert_eq!(lines.len(), 19);
    assert!(lines[12].starts_with("restictool_backup_timestamp_seconds"));
    assert!(lines[15].starts_with("restictool_backup_size_bytes"));
    assert_eq!(lines[16], "");
    assert!(lines[17].ends_with(" 1733832700"));
    assert_eq!(lines[18], "");
}

#[test]
fn test_invalid_json() {
    assert!(matches!(
        metrics::parse_snapshots("not json"),
        Err(metrics::MetricsError::Json(_))
    ));
}
