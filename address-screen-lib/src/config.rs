//! Configuration loading.
//!
//! Three sources feed a run:
//! - service credentials, which only ever come from the environment
//!   (`TRM_API_KEY`, `TRM_BASE_URL`) and are required
//! - optional TOML config files holding defaults
//! - optional `SCREEN_*` environment variables overriding those defaults

use crate::error::ScreenError;
use crate::types::DEFAULT_CHAIN;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "TRM_API_KEY";

/// Environment variable holding the service base URL.
pub const BASE_URL_VAR: &str = "TRM_BASE_URL";

/// Connection details for the screening service.
#[derive(Clone, PartialEq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ServiceConfig {
    /// Read the service configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Config` if either variable is missing or empty,
    /// or if the base URL is not http(s).
    pub fn from_env() -> Result<Self, ScreenError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScreenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ScreenError::config(format!("{} is not set", key)))
        };

        let api_key = required(API_KEY_VAR)?;
        let base_url = required(BASE_URL_VAR)?;

        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ScreenError::config(format!(
                "{} must be an http(s) URL, got '{}'",
                BASE_URL_VAR, base_url
            )));
        }

        Ok(Self { base_url, api_key })
    }
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Default concurrency level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Default per-request timeout (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Chain identifier sent with each address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,

    /// Severity level at or above which an address is blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_threshold: Option<u32>,
}

/// Configuration file discovery and loading.
#[derive(Debug)]
pub struct ConfigManager {
    /// Whether to report which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScreenError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScreenError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScreenError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG, then global, then local; later files win field by field.
    /// Files that fail to parse are reported and skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, ScreenError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!("Ignoring config file {}: {}", path.display(), e),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                tracing::info!("Loaded config file {}", path.display());
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./address-screen.toml", "./.address-screen.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".address-screen.toml");
        path.exists().then_some(path)
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("address-screen").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.chain.is_some() {
                        lower_defaults.chain = higher_defaults.chain;
                    }
                    if higher_defaults.severity_threshold.is_some() {
                        lower_defaults.severity_threshold = higher_defaults.severity_threshold;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), ScreenError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(concurrency) = defaults.concurrency {
            validate_concurrency(concurrency)?;
        }

        if let Some(timeout_str) = &defaults.timeout {
            if parse_timeout_string(timeout_str).is_none() {
                return Err(ScreenError::config(format!(
                    "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                    timeout_str
                )));
            }
        }

        if let Some(chain) = &defaults.chain {
            if chain.trim().is_empty() {
                return Err(ScreenError::config("Chain cannot be empty"));
            }
        }

        if defaults.severity_threshold == Some(0) {
            return Err(ScreenError::config("Severity threshold must be at least 1"));
        }

        Ok(())
    }
}

/// Check a concurrency limit is a positive integer.
pub fn validate_concurrency(concurrency: usize) -> Result<(), ScreenError> {
    if concurrency == 0 {
        return Err(ScreenError::config("Concurrency must be at least 1"));
    }
    Ok(())
}

/// Overrides read from `SCREEN_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub chain: Option<String>,
    pub severity_threshold: Option<u32>,
}

/// Load overrides from the process environment.
///
/// Invalid values are logged and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("SCREEN_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if validate_concurrency(concurrency).is_ok() => {
                tracing::debug!("Using SCREEN_CONCURRENCY={}", concurrency);
                env_config.concurrency = Some(concurrency);
            }
            _ => tracing::warn!(
                "Invalid SCREEN_CONCURRENCY='{}', must be a positive integer",
                val
            ),
        }
    }

    if let Some(val) = lookup("SCREEN_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(secs) => {
                tracing::debug!("Using SCREEN_TIMEOUT={}", val);
                env_config.timeout = Some(Duration::from_secs(secs));
            }
            None => tracing::warn!("Invalid SCREEN_TIMEOUT='{}', use format like '30s'", val),
        }
    }

    if let Some(chain) = lookup("SCREEN_CHAIN") {
        if !chain.trim().is_empty() {
            tracing::debug!("Using SCREEN_CHAIN={}", chain);
            env_config.chain = Some(chain.trim().to_string());
        }
    }

    if let Some(val) = lookup("SCREEN_THRESHOLD") {
        match val.trim().parse::<u32>() {
            Ok(threshold) if threshold > 0 => {
                tracing::debug!("Using SCREEN_THRESHOLD={}", threshold);
                env_config.severity_threshold = Some(threshold);
            }
            _ => tracing::warn!("Invalid SCREEN_THRESHOLD='{}', must be a positive integer", val),
        }
    }

    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds. Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    };

    secs.filter(|s| *s > 0)
}

impl DefaultsConfig {
    /// Chain from the file, falling back to the built-in default.
    pub fn chain_or_default(&self) -> String {
        self.chain
            .clone()
            .unwrap_or_else(|| DEFAULT_CHAIN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30s"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string(" 10S "), Some(10));
        assert_eq!(parse_timeout_string("0s"), None);
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_service_config_requires_both_variables() {
        let err = ServiceConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("TRM_API_KEY"));

        let err = ServiceConfig::from_lookup(lookup_from(&[("TRM_API_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("TRM_BASE_URL"));

        let err = ServiceConfig::from_lookup(lookup_from(&[
            ("TRM_API_KEY", "   "),
            ("TRM_BASE_URL", "https://api.example"),
        ]))
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_service_config_rejects_non_http_url() {
        let err = ServiceConfig::from_lookup(lookup_from(&[
            ("TRM_API_KEY", "k"),
            ("TRM_BASE_URL", "api.example.com"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_service_config_from_lookup() {
        let service = ServiceConfig::from_lookup(lookup_from(&[
            ("TRM_API_KEY", "secret"),
            ("TRM_BASE_URL", "https://api.trmlabs.com/public/v2"),
        ]))
        .unwrap();
        assert_eq!(service.api_key, "secret");
        assert_eq!(service.base_url, "https://api.trmlabs.com/public/v2");
        assert!(!format!("{:?}", service).contains("secret"));
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
concurrency = 25
timeout = "30s"
chain = "polygon"
severity_threshold = 10
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();
        let defaults = config.defaults.unwrap();

        assert_eq!(defaults.concurrency, Some(25));
        assert_eq!(defaults.timeout.as_deref(), Some("30s"));
        assert_eq!(defaults.chain_or_default(), "polygon");
        assert_eq!(defaults.severity_threshold, Some(10));
    }

    #[test]
    fn test_invalid_config_values() {
        let manager = ConfigManager::new(false);

        for content in [
            "[defaults]\nconcurrency = 0\n",
            "[defaults]\ntimeout = \"soon\"\n",
            "[defaults]\nchain = \"  \"\n",
            "[defaults]\nseverity_threshold = 0\n",
            "[defaults\nbroken",
        ] {
            let temp_file = write_config(content);
            assert!(
                manager.load_file(temp_file.path()).is_err(),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_large_concurrency_accepted() {
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(500).is_ok());
        assert!(validate_concurrency(0).is_err());

        let temp_file = write_config("[defaults]\nconcurrency = 250\n");
        let config = ConfigManager::new(false).load_file(temp_file.path()).unwrap();
        assert_eq!(config.defaults.unwrap().concurrency, Some(250));

        let env_config = load_env_config_from(lookup_from(&[("SCREEN_CONCURRENCY", "400")]));
        assert_eq!(env_config.concurrency, Some(400));
    }

    #[test]
    fn test_missing_config_file() {
        let manager = ConfigManager::new(false);
        let err = manager
            .load_file("/definitely/not/here/address-screen.toml")
            .unwrap_err();
        assert!(matches!(err, ScreenError::File { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(10),
                chain: Some("ethereum".to_string()),
                ..Default::default()
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(25),
                timeout: Some("5s".to_string()),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.concurrency, Some(25)); // Higher wins
        assert_eq!(defaults.chain.as_deref(), Some("ethereum")); // Lower preserved
        assert_eq!(defaults.timeout.as_deref(), Some("5s"));
        assert_eq!(defaults.severity_threshold, None);
    }

    #[test]
    fn test_merge_with_empty_side() {
        let manager = ConfigManager::new(false);
        let some = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(3),
                ..Default::default()
            }),
        };

        let merged = manager.merge_configs(FileConfig::default(), some.clone());
        assert_eq!(merged, some);
        let merged = manager.merge_configs(some.clone(), FileConfig::default());
        assert_eq!(merged, some);
    }

    #[test]
    fn test_env_config_parses_and_ignores_invalid() {
        let env_config = load_env_config_from(lookup_from(&[
            ("SCREEN_CONCURRENCY", "32"),
            ("SCREEN_TIMEOUT", "2m"),
            ("SCREEN_CHAIN", " bitcoin "),
            ("SCREEN_THRESHOLD", "10"),
        ]));
        assert_eq!(
            env_config,
            EnvConfig {
                concurrency: Some(32),
                timeout: Some(Duration::from_secs(120)),
                chain: Some("bitcoin".to_string()),
                severity_threshold: Some(10),
            }
        );

        let env_config = load_env_config_from(lookup_from(&[
            ("SCREEN_CONCURRENCY", "0"),
            ("SCREEN_TIMEOUT", "later"),
            ("SCREEN_CHAIN", ""),
            ("SCREEN_THRESHOLD", "-1"),
        ]));
        assert_eq!(env_config, EnvConfig::default());
    }
}
