//! Runner settings
//!
//! Layered, later wins: built-in defaults, `COURTROOM_*` environment
//! variables, an optional TOML file, then command-line flags.

use courtroom::{SessionConfig, TimingProfile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_STORE_URL: &str = "COURTROOM_STORE_URL";
pub const ENV_TEST_MODE: &str = "COURTROOM_TEST_MODE";
pub const ENV_SEED: &str = "COURTROOM_SEED";

const DEFAULT_STORE_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Resolved runner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the message store
    pub store_url: String,
    /// Keep messages in memory instead of talking to the store
    pub offline: bool,
    /// Compress every delay by 60x
    pub test_mode: bool,
    pub seed: Option<u64>,
    /// Generate new messages while the session runs
    pub arrivals: bool,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.to_string(),
            offline: false,
            test_mode: false,
            seed: None,
            arrivals: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// A partial layer of settings (config file or flags)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsOverrides {
    pub store_url: Option<String>,
    pub offline: Option<bool>,
    pub test_mode: Option<bool>,
    pub seed: Option<u64>,
    pub arrivals: Option<bool>,
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(url) = lookup(ENV_STORE_URL).filter(|v| !v.is_empty()) {
            settings.store_url = url;
        }
        if let Some(value) = lookup(ENV_TEST_MODE) {
            settings.test_mode = parse_flag(ENV_TEST_MODE, &value)?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            settings.seed = Some(value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_SEED,
                value: value.clone(),
            })?);
        }
        Ok(settings)
    }

    /// Parse a TOML settings file
    pub fn load_file(path: impl AsRef<Path>) -> Result<SettingsOverrides, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply a layer; set fields win.
    pub fn merge(&mut self, overrides: SettingsOverrides) {
        if let Some(store_url) = overrides.store_url {
            self.store_url = store_url;
        }
        if let Some(offline) = overrides.offline {
            self.offline = offline;
        }
        if let Some(test_mode) = overrides.test_mode {
            self.test_mode = test_mode;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        if let Some(arrivals) = overrides.arrivals {
            self.arrivals = arrivals;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timing: TimingProfile::for_mode(self.test_mode),
            seed: self.seed,
            arrivals: self.arrivals,
        }
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.store_url, "http://localhost:3000");
        assert_eq!(settings.session_config().timing, TimingProfile::production());
    }

    #[test]
    fn test_environment_layer() {
        let settings = Settings::from_lookup(env(&[
            (ENV_STORE_URL, "http://store:8080"),
            (ENV_TEST_MODE, "true"),
            (ENV_SEED, "42"),
        ]))
        .unwrap();
        assert_eq!(settings.store_url, "http://store:8080");
        assert!(settings.test_mode);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.session_config().timing, TimingProfile::test_mode());
    }

    #[test]
    fn test_bad_environment_values() {
        let err = Settings::from_lookup(env(&[(ENV_SEED, "forty-two")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_SEED, .. }));

        let err = Settings::from_lookup(env(&[(ENV_TEST_MODE, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_TEST_MODE, .. }));
    }

    #[test]
    fn test_file_then_flags_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
store_url = "http://file:3000"
test_mode = true
seed = 7
arrivals = false
"#
        )
        .unwrap();

        let mut settings =
            Settings::from_lookup(env(&[(ENV_STORE_URL, "http://env:3000")])).unwrap();
        settings.merge(Settings::load_file(file.path()).unwrap());
        assert_eq!(settings.store_url, "http://file:3000");
        assert_eq!(settings.seed, Some(7));
        assert!(!settings.arrivals);

        settings.merge(SettingsOverrides {
            seed: Some(99),
            offline: Some(true),
            ..Default::default()
        });
        assert_eq!(settings.seed, Some(99));
        assert!(settings.offline);
        assert!(settings.test_mode, "unset flags leave lower layers alone");
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "store = \"http://typo\"").unwrap();
        let err = Settings::load_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
