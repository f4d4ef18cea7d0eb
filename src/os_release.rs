// src/os_release.rs
//! Parser for the os-release distribution description file

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default locations, tried in order
pub const DEFAULT_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Fields of os-release used by plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub id_like: Vec<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub version_id: Option<String>,
    pub pretty_name: Option<String>,
    pub cpe_name: Option<String>,
    pub distro_codename: Option<String>,
    pub home_url: Option<String>,
}

impl OsRelease {
    /// Parse os-release content
    ///
    /// Lines without `=` and unknown keys are skipped. Values may be
    /// wrapped in double or single quotes.
    pub fn parse(content: &str) -> Self {
        let mut release = OsRelease::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            let slot = match key.trim() {
                "ID" => &mut release.id,
                "NAME" => &mut release.name,
                "VERSION" => &mut release.version,
                "VERSION_ID" => &mut release.version_id,
                "PRETTY_NAME" => &mut release.pretty_name,
                "CPE_NAME" => &mut release.cpe_name,
                "UBUNTU_CODENAME" => &mut release.distro_codename,
                "HOME_URL" => &mut release.home_url,
                "ID_LIKE" => {
                    release.id_like = value.split_whitespace().map(str::to_string).collect();
                    continue;
                }
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        release
    }

    /// Read and parse `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::NotFound(format!("os-release at {}: {}", path.display(), e)))?;
        debug!("loaded os-release from {}", path.display());
        Ok(Self::parse(&content))
    }

    /// Load from `path` if given, otherwise from the first default location that exists
    pub fn load_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let path = DEFAULT_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .ok_or_else(|| Error::NotFound("no os-release file found".to_string()))?;
        Self::load(&path)
    }

    /// True if this system is, or derives from, distribution `id`
    pub fn is_like(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id) || self.id_like.iter().any(|like| like == id)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote) {
            return inner.split(quote).next().unwrap_or(inner);
        }
    }
    value
}
