//! Prometheus text exposition of the latest snapshots
//!
//! The file holds a fixed header followed by one block per snapshot:
//!
//! ```text
//! restictool_backup_timestamp_seconds{hostname="h",repository="r",path="/volume/v"} 1733832768
//! restictool_backup_duration_seconds{hostname="h",repository="r",path="/volume/v"} 1.2
//! restictool_backup_files{hostname="h",repository="r",path="/volume/v"} 1131
//! restictool_backup_size_bytes{hostname="h",repository="r",path="/volume/v"} 369787002
//! ```

use chrono::DateTime;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

const TIMESTAMP_METRIC: &str = "restictool_backup_timestamp_seconds";
const DURATION_METRIC: &str = "restictool_backup_duration_seconds";
const FILES_METRIC: &str = "restictool_backup_files";
const SIZE_METRIC: &str = "restictool_backup_size_bytes";

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Invalid snapshot time {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Snapshot {0} has no paths")]
    MissingPath(String),

    #[error("Failed to parse snapshot list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write metrics file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetricsError>;

/// Snapshot record as printed by `restic snapshots --json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotRecord {
    pub time: String,

    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub hostname: String,

    #[serde(default)]
    pub short_id: String,

    /// Present for snapshots made by restic 0.17 and later
    #[serde(default)]
    pub summary: Option<SnapshotSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotSummary {
    pub backup_start: Option<String>,
    pub backup_end: Option<String>,
    pub total_files_processed: Option<u64>,
    pub total_bytes_processed: Option<u64>,
}

/// Values emitted for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub repository: String,
    pub hostname: String,
    pub path: String,

    /// Seconds since the epoch, microsecond precision
    pub timestamp: f64,

    pub duration: Option<f64>,
    pub files: Option<u64>,
    pub size: Option<u64>,
}

impl MetricSample {
    pub fn from_snapshot(repository: &str, record: &SnapshotRecord) -> Result<Self> {
        let path = record
            .paths
            .first()
            .cloned()
            .ok_or_else(|| MetricsError::MissingPath(record.short_id.clone()))?;

        let summary = record.summary.as_ref();

        let duration = match summary.and_then(|s| s.backup_start.as_ref().zip(s.backup_end.as_ref())) {
            Some((start, end)) => Some(time_string_to_timestamp(end)? - time_string_to_timestamp(start)?),
            None => None,
        };

        Ok(Self {
            repository: repository.to_string(),
            hostname: record.hostname.clone(),
            path,
            timestamp: time_string_to_timestamp(&record.time)?,
            duration,
            files: summary.and_then(|s| s.total_files_processed),
            size: summary.and_then(|s| s.total_bytes_processed),
        })
    }

    fn labels(&self) -> String {
        format!(
            "{{hostname=\"{}\",repository=\"{}\",path=\"{}\"}}",
            escape_label_value(&self.hostname),
            escape_label_value(&self.repository),
            escape_label_value(&self.path)
        )
    }

    /// Metric lines for this sample; optional values only when known
    pub fn metric_lines(&self) -> String {
        let labels = self.labels();
        let mut out = format!("{}{} {}\n", TIMESTAMP_METRIC, labels, self.timestamp.trunc() as i64);

        if let Some(duration) = self.duration {
            out.push_str(&format!("{}{} {:.1}\n", DURATION_METRIC, labels, duration));
        }
        if let Some(files) = self.files {
            out.push_str(&format!("{}{} {}\n", FILES_METRIC, labels, files));
        }
        if let Some(size) = self.size {
            out.push_str(&format!("{}{} {}\n", SIZE_METRIC, labels, size));
        }

        out
    }
}

/// `# HELP` and `# TYPE` lines of all metric families
pub fn header() -> String {
    [
        (TIMESTAMP_METRIC, "Time of the last backup", "counter"),
        (DURATION_METRIC, "Duration of the last backup", "gauge"),
        (FILES_METRIC, "Files processed by the last backup", "gauge"),
        (SIZE_METRIC, "Bytes processed by the last backup", "gauge"),
    ]
    .iter()
    .map(|(name, help, kind)| format!("# HELP {} {}\n# TYPE {} {}\n\n", name, help, name, kind))
    .collect()
}

/// Escape a Prometheus label value
pub fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// RFC 3339 time to seconds since the epoch, truncated to microseconds
pub fn time_string_to_timestamp(value: &str) -> Result<f64> {
    let time = DateTime::parse_from_rfc3339(value).map_err(|source| MetricsError::InvalidTimestamp {
        value: value.to_string(),
        source,
    })?;

    Ok(time.timestamp() as f64 + f64::from(time.timestamp_subsec_micros()) / 1_000_000.0)
}

/// Parse the JSON array printed by `restic snapshots --json`
pub fn parse_snapshots(json: &str) -> Result<Vec<SnapshotRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Full file contents: header, then each sample block followed by a blank line
pub fn render(repository: &str, records: &[SnapshotRecord]) -> Result<String> {
    let mut out = header();

    for record in records {
        out.push_str(&MetricSample::from_snapshot(repository, record)?.metric_lines());
        out.push('\n');
    }

    Ok(out)
}

/// Replace the metrics file with the samples of `records`
pub fn write_to_file(path: &Path, repository: &str, records: &[SnapshotRecord]) -> Result<()> {
    let contents = render(repository, records)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temporary = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&temporary)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temporary, path)?;
    debug!("Wrote {} snapshot sample(s) to {:?}", records.len(), path);
    Ok(())
}
