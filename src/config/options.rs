//! Option merging across the configured scopes

use super::loader::ResolvedConfig;
use super::types::OptionScope;

impl ResolvedConfig {
    /// Ordered restic options for the given scope.
    ///
    /// Lists are concatenated, never deduplicated: `common`, then the
    /// `volume`/`localdir` list, then the options of the matching volume or
    /// local directory entry. A volume without an exact entry falls back to
    /// the `*` entry. `Forget` uses `options.forget` alone.
    pub fn get_options(&self, scope: OptionScope<'_>) -> Vec<String> {
        let options = &self.config.options;

        if let OptionScope::Forget = scope {
            return options.forget.clone().unwrap_or_default();
        }

        let mut result: Vec<String> = options.common.clone().unwrap_or_default();

        match scope {
            OptionScope::Volume(name) => {
                if let Some(volume_options) = &options.volume {
                    result.extend(volume_options.iter().cloned());
                }

                let volumes = &self.config.volumes;
                let entry = volumes
                    .iter()
                    .find(|v| v.name == name)
                    .or_else(|| volumes.iter().find(|v| v.name == "*"));

                if let Some(own) = entry.and_then(|v| v.options.as_ref()) {
                    result.extend(own.iter().cloned());
                }
            }
            OptionScope::LocalDir(name) => {
                if let Some(localdir_options) = &options.localdir {
                    result.extend(localdir_options.iter().cloned());
                }

                let entry = self.config.localdirs.iter().find(|d| d.name == name);
                if let Some(own) = entry.and_then(|d| d.options.as_ref()) {
                    result.extend(own.iter().cloned());
                }
            }
            OptionScope::Common | OptionScope::Forget => {}
        }

        result
    }
}
