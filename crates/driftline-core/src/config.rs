use crate::error::{DriftlineError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the pipeline.
///
/// Precedence: defaults < config file < environment < CLI arguments.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Base URL of the remote hourly data source.
    pub base_url: ConfigValue<String>,
    /// Root of the working tree: current batch, archive and output artifact.
    pub data_dir: ConfigValue<PathBuf>,
    /// Path of the SQLite coordinate cache database.
    pub cache_db: ConfigValue<PathBuf>,
    /// Minimum spacing between external-call-incurring resolutions.
    pub min_interval_ms: ConfigValue<u64>,
    /// GeoNames account used by the nearby-feature lookup.
    pub geonames_user: ConfigValue<String>,
    pub nominatim_url: ConfigValue<String>,
    pub geonames_url: ConfigValue<String>,
    pub user_agent: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            base_url: ConfigValue::new(
                "https://a.windbornesystems.com/treasure".to_string(),
                ConfigSource::Default,
            ),
            data_dir: ConfigValue::new(PathBuf::from("data"), ConfigSource::Default),
            cache_db: ConfigValue::new(
                PathBuf::from("database/geocache.db"),
                ConfigSource::Default,
            ),
            min_interval_ms: ConfigValue::new(1200, ConfigSource::Default),
            geonames_user: ConfigValue::new("demo".to_string(), ConfigSource::Default),
            nominatim_url: ConfigValue::new(
                "https://nominatim.openstreetmap.org".to_string(),
                ConfigSource::Default,
            ),
            geonames_url: ConfigValue::new(
                "http://api.geonames.org".to_string(),
                ConfigSource::Default,
            ),
            user_agent: ConfigValue::new("driftline/0.1".to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| DriftlineError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| DriftlineError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(base_url) = file_config.base_url {
            self.base_url.update(base_url, ConfigSource::File);
        }
        if let Some(data_dir) = file_config.data_dir {
            self.data_dir.update(data_dir, ConfigSource::File);
        }
        if let Some(cache_db) = file_config.cache_db {
            self.cache_db.update(cache_db, ConfigSource::File);
        }
        if let Some(ms) = file_config.min_interval_ms {
            self.min_interval_ms.update(ms, ConfigSource::File);
        }
        if let Some(user) = file_config.geonames_user {
            self.geonames_user.update(user, ConfigSource::File);
        }
        if let Some(url) = file_config.nominatim_url {
            self.nominatim_url.update(url, ConfigSource::File);
        }
        if let Some(url) = file_config.geonames_url {
            self.geonames_url.update(url, ConfigSource::File);
        }
        if let Some(ua) = file_config.user_agent {
            self.user_agent.update(ua, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from `DRIFTLINE_*` environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(base_url) = env::var("DRIFTLINE_BASE_URL") {
            self.base_url.update(base_url, ConfigSource::Environment);
        }
        if let Ok(dir) = env::var("DRIFTLINE_DATA_DIR") {
            self.data_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(db) = env::var("DRIFTLINE_CACHE_DB") {
            self.cache_db.update(PathBuf::from(db), ConfigSource::Environment);
        }
        if let Ok(ms_str) = env::var("DRIFTLINE_MIN_INTERVAL_MS") {
            match ms_str.parse::<u64>() {
                Ok(ms) => self.min_interval_ms.update(ms, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid DRIFTLINE_MIN_INTERVAL_MS value '{}': expected milliseconds",
                    ms_str
                ),
            }
        }
        if let Ok(user) = env::var("DRIFTLINE_GEONAMES_USER") {
            self.geonames_user.update(user, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url.update(base_url, ConfigSource::Cli);
        }
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir.update(data_dir, ConfigSource::Cli);
        }
        if let Some(cache_db) = overrides.cache_db {
            self.cache_db.update(cache_db, ConfigSource::Cli);
        }
    }

    /// Directory holding the current batch of hour files.
    pub fn current_dir(&self) -> PathBuf {
        self.data_dir.value.join("current")
    }

    /// Root of the timestamped archive buckets.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.value.join("archive")
    }

    /// Path of the enriched trajectory output artifact.
    pub fn processed_path(&self) -> PathBuf {
        self.data_dir.value.join("processed.json")
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    base_url: Option<String>,
    data_dir: Option<PathBuf>,
    cache_db: Option<PathBuf>,
    min_interval_ms: Option<u64>,
    geonames_user: Option<String>,
    nominatim_url: Option<String>,
    geonames_url: Option<String>,
    user_agent: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub cache_db: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.min_interval_ms.value, 1200);
        assert_eq!(config.min_interval_ms.source, ConfigSource::Default);
        assert_eq!(config.data_dir.value, PathBuf::from("data"));
        assert_eq!(config.current_dir(), PathBuf::from("data/current"));
        assert_eq!(config.processed_path(), PathBuf::from("data/processed.json"));
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "http://localhost:9001/batches"
data_dir = "/var/lib/driftline"
min_interval_ms = 500
geonames_user = "operator"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.base_url.value, "http://localhost:9001/batches");
        assert_eq!(config.base_url.source, ConfigSource::File);
        assert_eq!(config.data_dir.value, PathBuf::from("/var/lib/driftline"));
        assert_eq!(config.min_interval_ms.value, 500);
        assert_eq!(config.geonames_user.value, "operator");
        // Untouched values keep their defaults
        assert_eq!(config.user_agent.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        let overrides = CliConfigOverrides {
            base_url: Some("http://mirror.example/data".to_string()),
            data_dir: None,
            cache_db: Some(PathBuf::from("/tmp/cache.db")),
        };

        config.update_from_cli(overrides);

        assert_eq!(config.base_url.value, "http://mirror.example/data");
        assert_eq!(config.base_url.source, ConfigSource::Cli);
        assert_eq!(config.cache_db.value, PathBuf::from("/tmp/cache.db"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
    }
}
