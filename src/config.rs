// src/config.rs
//! Configuration file parsing
//!
//! Supports a TOML configuration file with the following sections:
//! - [plugins] - Allow/block lists and intra-plugin concurrency
//! - [settings] - Initial values for the settings provider
//! - [catalog] - App catalog files loaded by the appstream plugin
//! - [history] - History service query timeout
//! - [os_release] - Location of the os-release file

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plugins: PluginsSection,

    #[serde(default)]
    pub settings: SettingsSection,

    #[serde(default)]
    pub catalog: CatalogSection,

    #[serde(default)]
    pub history: HistorySection,

    #[serde(default)]
    pub os_release: OsReleaseSection,
}

/// Plugin selection and limits
#[derive(Debug, Clone, Deserialize)]
pub struct PluginsSection {
    /// If non-empty, only these plugins are enabled
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Plugins that are always disabled
    #[serde(default)]
    pub blocklist: Vec<String>,

    /// Upper bound on concurrent sub-operations inside one plugin step
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            allowlist: Vec::new(),
            blocklist: Vec::new(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}

/// Initial settings store values
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsSection {
    /// Repository globs considered official
    #[serde(default)]
    pub official_repos: Vec<String>,

    /// Repository globs whose packages are all free software
    #[serde(default)]
    pub free_repos: Vec<String>,

    /// Page describing the free software policy
    #[serde(default)]
    pub free_repos_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSection {
    /// JSON catalog files, loaded in order
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    /// Deadline for one history service query, e.g. "5s" or "1m"
    #[serde(default = "default_history_timeout")]
    pub timeout: String,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            timeout: default_history_timeout(),
        }
    }
}

fn default_history_timeout() -> String {
    "5s".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsReleaseSection {
    /// Override for the os-release location
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default location under the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("appcenter").join("config.toml"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.plugins.max_concurrency == 0 {
            return Err(Error::Configuration(
                "plugins.max_concurrency must be at least 1".to_string(),
            ));
        }
        for name in &self.plugins.allowlist {
            if self.plugins.blocklist.contains(name) {
                return Err(Error::Configuration(format!(
                    "plugin '{}' is both allowed and blocked",
                    name
                )));
            }
        }
        self.history_timeout()?;
        Ok(())
    }

    pub fn history_timeout(&self) -> Result<Duration> {
        parse_duration(&self.history.timeout)
    }
}

/// Parse a duration string like "30s", "15m", "1h" or a bare number of seconds
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 60 * 60)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("Invalid duration: {}", s)))?;

    if multiplier == 0 {
        return Ok(Duration::from_millis(num));
    }
    Ok(Duration::from_secs(num * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.plugins.max_concurrency, 8);
        assert_eq!(config.history_timeout().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::parse(
            r#"
[plugins]
blocklist = ["dpkg"]
max_concurrency = 2

[settings]
official-repos = ["fedora*", "updates"]
free-repos = ["fedora"]
free-repos-url = "https://example.org/free"

[catalog]
paths = ["/usr/share/appcenter/catalog.json"]

[history]
timeout = "2s"
"#,
        )
        .unwrap();

        assert_eq!(config.plugins.blocklist, vec!["dpkg"]);
        assert_eq!(config.plugins.max_concurrency, 2);
        assert_eq!(config.settings.official_repos, vec!["fedora*", "updates"]);
        assert_eq!(
            config.settings.free_repos_url.as_deref(),
            Some("https://example.org/free")
        );
        assert_eq!(config.catalog.paths.len(), 1);
        assert_eq!(config.history_timeout().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::parse("[plugins]\nmax_concurrency = 0\n"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Config::parse("[plugins]\nallowlist = [\"a\"]\nblocklist = [\"a\"]\n"),
            Err(Error::Configuration(_))
        ));
        assert!(Config::parse("[plugins\n").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("none.toml")).unwrap();
        assert!(config.plugins.allowlist.is_empty());
    }
}
