use serde::Serialize;
use std::collections::BTreeMap;

/// Root configuration document, as validated from YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Config {
    pub repository: Repository,

    #[serde(skip_serializing_if = "Options::is_empty")]
    pub options: Options,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeSpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub localdirs: Vec<LocalDirSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

/// Backup repository description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Repository {
    /// Repository location as understood by restic (`s3:...`, `sftp:...`, a path)
    pub location: String,

    pub password: String,

    /// Host name recorded in the snapshots (defaults to the system host name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Credentials passed to restic as environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub authentication: BTreeMap<String, String>,

    /// Any other environment variables for restic
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Option lists passed verbatim to restic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common: Option<Vec<String>>,

    /// Retention policy flags, used only for `forget` and `prune`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forget: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub localdir: Option<Vec<String>>,
}

impl Options {
    pub fn is_empty(&self) -> bool {
        self.common.is_none()
            && self.forget.is_none()
            && self.volume.is_none()
            && self.localdir.is_none()
    }
}

/// Docker volume to back up. The name `*` stands for all non-anonymous volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeSpec {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Local directory to back up under the given tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalDirSpec {
    pub name: String,
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsConfig {
    pub directory: String,
}

/// Selects which configured option lists apply to a restic invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope<'a> {
    /// Repository-wide commands (`run`, `snapshots`, `restore`, ...)
    Common,
    Volume(&'a str),
    LocalDir(&'a str),
    /// Retention commands; disjoint from all other lists
    Forget,
}
