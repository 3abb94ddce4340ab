//! Validates the raw configuration document into the typed model
//!
//! The schema is small and fixed, so the document is walked explicitly
//! instead of relying on derived deserialization. Every failure names the
//! offending field path.

use super::loader::{ConfigError, Result};
use super::types::*;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Validate a parsed YAML document and build the typed configuration
pub fn validate(document: &Value) -> Result<Config> {
    let root = as_mapping(document, "configuration")?;

    let repository = match root.get("repository") {
        Some(value) => validate_repository(value)?,
        None => return Err(invalid("repository", "missing")),
    };

    let options = match root.get("options") {
        Some(value) => validate_options(value)?,
        None => Options::default(),
    };

    let volumes = match root.get("volumes") {
        Some(value) => as_sequence(value, "volumes")?
            .iter()
            .enumerate()
            .map(|(i, v)| validate_volume(v, &format!("volumes[{}]", i)))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let localdirs = match root.get("localdirs") {
        Some(value) => as_sequence(value, "localdirs")?
            .iter()
            .enumerate()
            .map(|(i, v)| validate_localdir(v, &format!("localdirs[{}]", i)))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let metrics = match root.get("metrics") {
        Some(value) => {
            let map = as_mapping(value, "metrics")?;
            Some(MetricsConfig {
                directory: required_string(map, "metrics", "directory")?,
            })
        }
        None => None,
    };

    // Unknown top-level keys are tolerated for forward compatibility
    Ok(Config {
        repository,
        options,
        volumes,
        localdirs,
        metrics,
    })
}

fn validate_repository(value: &Value) -> Result<Repository> {
    let map = as_mapping(value, "repository")?;

    Ok(Repository {
        location: required_string(map, "repository", "location")?,
        password: required_string(map, "repository", "password")?,
        host: optional_string(map, "repository", "host")?,
        authentication: string_map(map, "repository", "authentication")?,
        extra: string_map(map, "repository", "extra")?,
    })
}

fn validate_options(value: &Value) -> Result<Options> {
    let map = as_mapping(value, "options")?;

    Ok(Options {
        common: string_list(map, "options", "common")?,
        forget: string_list(map, "options", "forget")?,
        volume: string_list(map, "options", "volume")?,
        localdir: string_list(map, "options", "localdir")?,
    })
}

fn validate_volume(value: &Value, path: &str) -> Result<VolumeSpec> {
    let map = as_mapping(value, path)?;

    Ok(VolumeSpec {
        name: required_string(map, path, "name")?,
        options: string_list(map, path, "options")?,
    })
}

fn validate_localdir(value: &Value, path: &str) -> Result<LocalDirSpec> {
    let map = as_mapping(value, path)?;

    Ok(LocalDirSpec {
        name: required_string(map, path, "name")?,
        path: required_string(map, path, "path")?,
        options: string_list(map, path, "options")?,
    })
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::ValidationError {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn field_path(parent: &str, key: &str) -> String {
    format!("{}.{}", parent, key)
}

fn as_mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping> {
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Err(invalid(path, "missing")),
        _ => Err(invalid(path, "must be a mapping")),
    }
}

fn as_sequence<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>> {
    match value {
        Value::Sequence(seq) => Ok(seq),
        _ => Err(invalid(path, "must be a list")),
    }
}

fn non_empty_string(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) if s.is_empty() => Err(invalid(path, "must not be empty")),
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(invalid(path, "missing")),
        _ => Err(invalid(path, "must be a string")),
    }
}

fn required_string(map: &Mapping, parent: &str, key: &str) -> Result<String> {
    let path = field_path(parent, key);
    match map.get(key) {
        Some(value) => non_empty_string(value, &path),
        None => Err(invalid(&path, "missing")),
    }
}

fn optional_string(map: &Mapping, parent: &str, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        Some(value) => non_empty_string(value, &field_path(parent, key)).map(Some),
        None => Ok(None),
    }
}

fn string_list(map: &Mapping, parent: &str, key: &str) -> Result<Option<Vec<String>>> {
    let path = field_path(parent, key);
    let Some(value) = map.get(key) else {
        return Ok(None);
    };

    as_sequence(value, &path)?
        .iter()
        .enumerate()
        .map(|(i, item)| non_empty_string(item, &format!("{}[{}]", path, i)))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn string_map(map: &Mapping, parent: &str, key: &str) -> Result<BTreeMap<String, String>> {
    let path = field_path(parent, key);
    let Some(value) = map.get(key) else {
        return Ok(BTreeMap::new());
    };

    let mut result = BTreeMap::new();
    for (k, v) in as_mapping(value, &path)? {
        let Value::String(name) = k else {
            return Err(invalid(&path, "keys must be strings"));
        };
        match v {
            Value::String(s) => {
                result.insert(name.clone(), s.clone());
            }
            _ => return Err(invalid(&field_path(&path, name), "must be a string")),
        }
    }

    Ok(result)
}
