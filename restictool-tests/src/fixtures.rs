//! Test fixtures and sample data
//!
//! Provides `restic snapshots --json` output and volume inventories.

/// Snapshot made by restic 0.16, without a summary
pub const SNAPSHOT_WITHOUT_SUMMARY: &str = r#"{
    "time": "2024-12-10T12:11:40.914326222Z",
    "tree": "fc8127bd1dc17099816993dd34c997b1c9b69120a2c83277f135bf56af58addd",
    "paths": ["/volume/vscode"],
    "hostname": "mbair",
    "username": "root",
    "program_version": "restic 0.16.3",
    "id": "5b854a961f398fc11a25fb94c66ee64fbc60b74b80c528929901e2abb959025f",
    "short_id": "5b854a96"
}"#;

/// Snapshot made by restic 0.17, with a summary
pub const SNAPSHOT_WITH_SUMMARY: &str = r#"{
    "time": "2024-12-10T12:12:48.263973669Z",
    "parent": "5b854a961f398fc11a25fb94c66ee64fbc60b74b80c528929901e2abb959025f",
    "tree": "9b1c8d584374df0e769ab025b7ff1ba6e074b480ded05aa16ca79256ed3d7d53",
    "paths": ["/volume/vscode"],
    "hostname": "mbair",
    "username": "root",
    "program_version": "restic 0.17.3",
    "summary": {
        "backup_start": "2024-12-10T12:12:48.263973669Z",
        "backup_end": "2024-12-10T12:12:49.419041586Z",
        "files_new": 0,
        "files_changed": 0,
        "files_unmodified": 1131,
        "dirs_new": 0,
        "dirs_changed": 1,
        "dirs_unmodified": 412,
        "data_blobs": 0,
        "tree_blobs": 1,
        "data_added": 352,
        "data_added_packed": 291,
        "total_files_processed": 1131,
        "total_bytes_processed": 369787002
    },
    "id": "e61d0293e60dc5b97b7c982c815e180d733a84405247a48dd1ed5d5bb38753a3",
    "short_id": "e61d0293"
}"#;

/// JSON array of both sample snapshots, as one line of container output
pub fn sample_snapshots_json() -> String {
    let value = serde_json::json!([
        serde_json::from_str::<serde_json::Value>(SNAPSHOT_WITHOUT_SUMMARY).expect("valid fixture"),
        serde_json::from_str::<serde_json::Value>(SNAPSHOT_WITH_SUMMARY).expect("valid fixture"),
    ]);
    value.to_string()
}

/// Snapshot for a volume taken on a host at a given time
pub fn snapshot_json(hostname: &str, path: &str, time: &str) -> String {
    serde_json::json!({
        "time": time,
        "paths": [path],
        "hostname": hostname,
        "short_id": "0123abcd",
    })
    .to_string()
}

/// Volume names created by a compose project
pub fn compose_volumes() -> Vec<String> {
    vec![
        "nextcloud_db".to_string(),
        "nextcloud_html".to_string(),
        "nextcloud_redis".to_string(),
    ]
}

/// Anonymous volume name as generated by docker
pub fn anonymous_volume() -> String {
    "0f3c9b1e7a2d4c6e8f0a1b3c5d7e9f1a2b4c6d8e0f1a3b5c7d9e1f2a4b6c8d0e".to_string()
}
