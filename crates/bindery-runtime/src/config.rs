#![forbid(unsafe_code)]

//! Engine policy for dual bindings.
//!
//! [`BindingConfig`] carries the knobs that are a matter of application
//! policy rather than per-binding wiring. With the `policy-config` feature
//! it can be loaded from a TOML or JSON file:
//!
//! ```toml
//! default_direction = "one_way"
//! coerce_write_back = false
//! warn_on_failure = true
//! ```
//!
//! Missing keys keep their defaults; unknown keys are rejected.

#[cfg(feature = "policy-config")]
use std::path::{Path, PathBuf};

use bindery_core::BindingDirection;

/// Policy applied to every dual binding built with it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct BindingConfig {
    /// Direction used when a bind call does not name one.
    pub default_direction: BindingDirection,
    /// After a two-way push, write the receiving side's normalized value
    /// back to the sending side if it differs.
    pub coerce_write_back: bool,
    /// Log failed propagations at `warn` (otherwise `debug`).
    pub warn_on_failure: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            default_direction: BindingDirection::TwoWay,
            coerce_write_back: true,
            warn_on_failure: true,
        }
    }
}

impl BindingConfig {
    #[must_use]
    pub fn with_default_direction(mut self, direction: BindingDirection) -> Self {
        self.default_direction = direction;
        self
    }

    #[must_use]
    pub fn with_coerce_write_back(mut self, enabled: bool) -> Self {
        self.coerce_write_back = enabled;
        self
    }

    #[must_use]
    pub fn with_warn_on_failure(mut self, enabled: bool) -> Self {
        self.warn_on_failure = enabled;
        self
    }
}

/// Errors from loading a [`BindingConfig`].
#[cfg(feature = "policy-config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format for {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
}

#[cfg(feature = "policy-config")]
impl BindingConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from `path`, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> Result<Self, ConfigError> = match ext.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("json") => Self::from_json_str,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = parse(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded binding config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BindingConfig::default();
        assert_eq!(config.default_direction, BindingDirection::TwoWay);
        assert!(config.coerce_write_back);
        assert!(config.warn_on_failure);
    }

    #[test]
    fn builder_setters() {
        let config = BindingConfig::default()
            .with_default_direction(BindingDirection::OneWay)
            .with_coerce_write_back(false)
            .with_warn_on_failure(false);
        assert_eq!(config.default_direction, BindingDirection::OneWay);
        assert!(!config.coerce_write_back);
        assert!(!config.warn_on_failure);
    }

    #[cfg(feature = "policy-config")]
    mod policy_config {
        use super::*;
        use std::io::Write;

        #[test]
        fn toml_partial_keeps_defaults() {
            let config = BindingConfig::from_toml_str("default_direction = \"one_way\"\n").unwrap();
            assert_eq!(config.default_direction, BindingDirection::OneWay);
            assert!(config.coerce_write_back);
        }

        #[test]
        fn json_round_trip() {
            let config = BindingConfig::default().with_warn_on_failure(false);
            let json = serde_json::to_string(&config).unwrap();
            assert_eq!(BindingConfig::from_json_str(&json).unwrap(), config);
        }

        #[test]
        fn unknown_key_is_rejected() {
            assert!(matches!(
                BindingConfig::from_toml_str("strict = true\n"),
                Err(ConfigError::Toml(_))
            ));
        }

        #[test]
        fn load_by_extension() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("bindings.toml");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "coerce_write_back = false").unwrap();
            drop(file);

            let config = BindingConfig::load(&path).unwrap();
            assert!(!config.coerce_write_back);

            let other = dir.path().join("bindings.yaml");
            assert!(matches!(
                BindingConfig::load(&other),
                Err(ConfigError::UnsupportedFormat(_))
            ));
            assert!(matches!(
                BindingConfig::load(dir.path().join("missing.json")),
                Err(ConfigError::Io { .. })
            ));
        }
    }
}
