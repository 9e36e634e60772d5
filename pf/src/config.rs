//! Pathfinder configuration types and loading

use eyre::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Pathfinder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Backend REST API configuration
    pub api: ApiConfig,

    /// Mapping provider configuration
    pub mapping: MappingConfig,

    /// Persisted client storage configuration
    pub storage: StorageConfig,

    /// Plan creation defaults
    pub plan: PlanConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the configured URLs parse. The mapping token is only checked when
    /// a mapping client is built, since most commands never touch the mapping provider.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api.base_url).context(format!("Invalid api.base-url: {}", self.api.base_url))?;
        Url::parse(&self.api.csrf_url).context(format!("Invalid api.csrf-url: {}", self.api.csrf_url))?;
        Url::parse(&self.mapping.base_url).context(format!("Invalid mapping.base-url: {}", self.mapping.base_url))?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .pathfinder.yml
        let local_config = PathBuf::from(".pathfinder.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/pathfinder/pathfinder.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pathfinder").join("pathfinder.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed: a broken config file is reported properly by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".pathfinder.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("pathfinder").join("pathfinder.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Backend REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto (trailing slash significant)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// URL that sets the XSRF-TOKEN cookie
    #[serde(rename = "csrf-url")]
    pub csrf_url: String,

    /// Optional request timeout in milliseconds (none = client default, no deadline)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            csrf_url: "http://localhost:8000/sanctum/csrf-cookie".to_string(),
            timeout_ms: None,
        }
    }
}

/// Mapping provider configuration (geocoding + walking directions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Provider API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the access token
    #[serde(rename = "access-token-env")]
    pub access_token_env: String,

    /// Bias geocoding results towards this `[lng, lat]` point
    pub proximity: Option<[f64; 2]>,

    /// Maximum autocomplete candidates per query
    #[serde(rename = "autocomplete-limit")]
    pub autocomplete_limit: u8,

    /// ISO country codes to restrict geocoding to
    pub countries: Vec<String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            access_token_env: "MAPBOX_ACCESS_TOKEN".to_string(),
            proximity: Some([-2.5879, 51.4545]),
            autocomplete_limit: 5,
            countries: vec!["gb".to_string()],
        }
    }
}

impl MappingConfig {
    /// Read the access token from the configured environment variable
    pub fn access_token(&self) -> Result<String> {
        std::env::var(&self.access_token_env).map_err(|_| {
            eyre::eyre!(
                "Mapping access token not found. Set the {} environment variable.",
                self.access_token_env
            )
        })
    }
}

/// Persisted client storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage file holding the session token and user id
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: localstore::LocalStore::default_path("pathfinder"),
        }
    }
}

impl StorageConfig {
    /// Expand a leading `~/` to the home directory
    pub fn expanded_path(&self) -> PathBuf {
        match self.path.to_str().and_then(|p| p.strip_prefix("~/")) {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| self.path.clone()),
            None => self.path.clone(),
        }
    }
}

/// Plan creation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Name used when a plan is saved with a blank name
    #[serde(rename = "default-name")]
    pub default_name: String,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            default_name: "My Pathfinder Plan".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://localhost:8000/api/");
        assert!(config.api.timeout_ms.is_none());
        assert_eq!(config.mapping.access_token_env, "MAPBOX_ACCESS_TOKEN");
        assert_eq!(config.plan.default_name, "My Pathfinder Plan");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: DEBUG

api:
  base-url: https://pathfinder.example.com/api/
  csrf-url: https://pathfinder.example.com/sanctum/csrf-cookie
  timeout-ms: 10000

mapping:
  access-token-env: MY_MAP_TOKEN
  autocomplete-limit: 3
  countries: []

storage:
  path: /tmp/pathfinder/storage.json

plan:
  default-name: "Night Out"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(config.api.base_url, "https://pathfinder.example.com/api/");
        assert_eq!(config.api.timeout_ms, Some(10000));
        assert_eq!(config.mapping.access_token_env, "MY_MAP_TOKEN");
        assert_eq!(config.mapping.autocomplete_limit, 3);
        assert!(config.mapping.countries.is_empty());
        assert_eq!(config.storage.path, PathBuf::from("/tmp/pathfinder/storage.json"));
        assert_eq!(config.plan.default_name, "Night Out");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
api:
  base-url: http://10.0.0.5/api/
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.api.base_url, "http://10.0.0.5/api/");
        assert_eq!(config.api.csrf_url, "http://localhost:8000/sanctum/csrf-cookie");
        assert_eq!(config.mapping.base_url, "https://api.mapbox.com");
        assert_eq!(config.plan.default_name, "My Pathfinder Plan");
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file_and_log_level() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pathfinder.yml");
        fs::write(&path, "log-level: WARN\nplan:\n  default-name: Pub Crawl\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.plan.default_name, "Pub Crawl");
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_storage_path_expands_home() {
        let storage = StorageConfig {
            path: PathBuf::from("~/pf/storage.json"),
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(storage.expanded_path(), home.join("pf/storage.json"));
        }
    }

    #[test]
    #[serial]
    fn test_mapping_access_token_from_env() {
        let mapping = MappingConfig {
            access_token_env: "PATHFINDER_TEST_MAP_TOKEN".to_string(),
            ..Default::default()
        };

        // SAFETY: serialised test; no other thread reads this variable
        unsafe { std::env::remove_var("PATHFINDER_TEST_MAP_TOKEN") };
        assert!(mapping.access_token().is_err());

        unsafe { std::env::set_var("PATHFINDER_TEST_MAP_TOKEN", "pk.test") };
        assert_eq!(mapping.access_token().unwrap(), "pk.test");

        unsafe { std::env::remove_var("PATHFINDER_TEST_MAP_TOKEN") };
    }
}
