//! Configuration for the translation registry
//!
//! Holds crate-wide constants, the typed options accepted by
//! [`Registry::setup`](crate::registry::Registry::setup), HTTP client settings,
//! and the JSON configuration file read by the command-line tool.

use crate::error::{ConfigError, ConfigResult, DescriptorError};
use crate::storage::StorageLocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier following reverse-DNS convention
pub const APP_ID: &str = "org.i18n.Registry";

/// Token in a source template replaced by the active locale
pub const LOCALE_PLACEHOLDER: &str = "{locale}";

/// Number of positional substitution parameters (`{0}` through `{9}`)
pub const PARAMETER_COUNT: usize = 10;

/// User agent sent with bundle requests
pub const DEFAULT_USER_AGENT: &str = concat!("i18n-registry/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed when fetching a bundle
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Name of the directory holding durable storage files
const STORAGE_DIR: &str = "storage";

/// Options accepted by `Registry::setup`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupOptions {
    /// Bundle URL template, `{locale}` is replaced by the active locale
    pub source: Option<String>,

    /// Default active locale
    pub locale: Option<String>,

    /// Where configuration and cache are persisted (no persistence when `None`)
    pub save: Option<StorageLocation>,

    /// Ignore any persisted configuration and reload
    pub force: bool,

    /// Date of the last translation change; older persisted caches are reloaded
    pub date: Option<DateTime<Utc>>,
}

impl SetupOptions {
    /// Create options with a source template and a default locale
    pub fn new(source: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            locale: Some(locale.into()),
            ..Self::default()
        }
    }

    /// Persist configuration and cache at the given location
    pub fn save(mut self, location: StorageLocation) -> Self {
        self.save = Some(location);
        self
    }

    /// Ignore persisted configuration
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the freshness date
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

/// HTTP client settings for bundle fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent header
    pub user_agent: String,

    /// Request timeout in seconds (no timeout when unset)
    pub timeout_secs: Option<u64>,

    /// Redirect limit
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl FetchConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Setup section of the configuration file
///
/// Same fields as [`SetupOptions`] but with the storage location kept as its
/// descriptor string, parsed when converted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    pub source: Option<String>,
    pub locale: Option<String>,
    pub save: Option<String>,
    pub force: bool,
    pub date: Option<DateTime<Utc>>,
}

impl SetupConfig {
    /// Convert into setup options, parsing the storage descriptor
    pub fn to_options(&self) -> Result<SetupOptions, DescriptorError> {
        let save = match self.save.as_deref() {
            Some(descriptor) if !descriptor.is_empty() => {
                Some(StorageLocation::parse(descriptor)?)
            }
            _ => None,
        };

        Ok(SetupOptions {
            source: self.source.clone(),
            locale: self.locale.clone(),
            save,
            force: self.force,
            date: self.date,
        })
    }
}

/// Configuration file read by the command-line tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry setup options
    pub setup: SetupConfig,

    /// HTTP client settings
    pub fetch: FetchConfig,
}

impl Config {
    /// Load a configuration file
    pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save a configuration file, creating parent directories
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        std::fs::write(path, content).map_err(|e| ConfigError::SaveError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the data directory path
    pub fn data_dir() -> ConfigResult<PathBuf> {
        dirs::data_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the directory used by the durable storage backend
    pub fn storage_dir() -> ConfigResult<PathBuf> {
        Self::data_dir().map(|p| p.join(STORAGE_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageKind;
    use tempfile::tempdir;

    #[test]
    fn test_setup_options_builder() {
        let date = Utc::now();
        let options = SetupOptions::new("/i18n/{locale}.json", "en")
            .save(StorageLocation::durable("app.i18n"))
            .force(true)
            .date(date);

        assert_eq!(options.source.as_deref(), Some("/i18n/{locale}.json"));
        assert_eq!(options.locale.as_deref(), Some("en"));
        assert_eq!(options.save.as_ref().map(|s| s.kind), Some(StorageKind::Durable));
        assert!(options.force);
        assert_eq!(options.date, Some(date));
    }

    #[test]
    fn test_setup_config_parses_descriptor() {
        let setup = SetupConfig {
            source: Some("/i18n/{locale}.json".to_string()),
            locale: Some("fr".to_string()),
            save: Some("session[my-app]".to_string()),
            ..SetupConfig::default()
        };

        let options = setup.to_options().unwrap();
        assert_eq!(options.save, Some(StorageLocation::session("my-app")));
    }

    #[test]
    fn test_setup_config_rejects_bad_descriptor() {
        let setup = SetupConfig {
            save: Some("cookies[my-app]".to_string()),
            ..SetupConfig::default()
        };

        assert!(setup.to_options().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("i18n.json");

        let config = Config {
            setup: SetupConfig {
                source: Some("https://example.org/i18n/{locale}.json".to_string()),
                locale: Some("de".to_string()),
                save: Some("durable[app]".to_string()),
                force: false,
                date: Some(Utc::now()),
            },
            fetch: FetchConfig {
                timeout_secs: Some(5),
                ..FetchConfig::default()
            },
        };

        config.save_to_path(&path).unwrap();
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_missing_sections_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("i18n.json");
        std::fs::write(&path, r#"{"setup": {"locale": "en"}}"#).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.setup.locale.as_deref(), Some("en"));
        assert_eq!(loaded.fetch, FetchConfig::default());
        assert!(loaded.fetch.timeout().is_none());
    }

    #[test]
    fn test_config_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("i18n.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
