// src/plugins/dpkg.rs

//! Describe local `.deb` files using `dpkg-deb`

use crate::app::{App, AppKind, AppList, AppState, BundleKind, Quality, UrlKind};
use crate::error::{Error, Result};
use crate::plugin::helpers::run_command;
use crate::plugin::{Capabilities, Plugin, PluginContext};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NAME: &str = "dpkg";

const DPKG_DEB: &str = "dpkg-deb";
const SHOW_FORMAT: &str = "--showformat=${Package}\\n${Version}\\n${License}\\n${Installed-Size}\\n${Homepage}\\n${Description}";

/// Paragraph separator line inside a control-file description
const PARAGRAPH_MARK: &str = " .";

/// Fields read from a package's control data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebInfo {
    pub package: String,
    pub version: String,
    pub license: Option<String>,
    /// In bytes
    pub installed_size: Option<u64>,
    pub homepage: Option<String>,
    pub summary: String,
    pub description: String,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Parse `dpkg-deb -W` output produced with [`SHOW_FORMAT`]
///
/// Continuation lines of the description are joined with spaces; a line
/// holding only `" ."` starts a new line. An `Installed-Size` too large to
/// express in bytes is treated as unknown.
pub fn parse_deb_info(output: &str) -> Result<DebInfo> {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() < 6 {
        return Err(Error::DataFormat(format!(
            "{} output has {} fields, expected at least 6",
            DPKG_DEB,
            lines.len()
        )));
    }
    let package = lines[0].trim();
    if package.is_empty() {
        return Err(Error::DataFormat(format!("{} output has no package name", DPKG_DEB)));
    }

    let mut description = String::new();
    for line in &lines[6..] {
        if *line == PARAGRAPH_MARK {
            description.truncate(description.trim_end_matches(' ').len());
            description.push('\n');
            continue;
        }
        let line = line.trim();
        if !line.is_empty() {
            description.push_str(line);
            description.push(' ');
        }
    }
    let description = description.trim_end().to_string();

    Ok(DebInfo {
        package: package.to_string(),
        version: lines[1].trim().to_string(),
        license: non_empty(lines[2]),
        installed_size: lines[3]
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|kib| kib.checked_mul(1024)),
        homepage: non_empty(lines[4]),
        summary: lines[5].trim().to_string(),
        description,
    })
}

fn is_deb(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("deb"))
}

fn deb_app(ctx: &PluginContext, info: DebInfo) -> App {
    let app = ctx.new_app(None);
    app.update(|data| {
        data.set_state(AppState::AvailableLocal);
        data.kind = AppKind::Generic;
        data.bundle_kind = BundleKind::Package;
        data.add_source(info.package.as_str());
        data.set_name(Quality::Lowest, info.package.as_str());
        data.set_summary(Quality::Lowest, info.summary);
        if !info.description.is_empty() {
            data.set_description(Quality::Lowest, info.description);
        }
        if let Some(license) = info.license {
            data.set_license(Quality::Lowest, license);
        }
        if !info.version.is_empty() {
            data.version = Some(info.version);
        }
        data.size_installed = info.installed_size;
        if let Some(homepage) = info.homepage {
            data.set_url(UrlKind::Homepage, homepage);
        }
    });
    app
}

#[derive(Debug, Default)]
pub struct DpkgPlugin {
    binary: RwLock<Option<PathBuf>>,
}

impl DpkgPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Plugin for DpkgPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP | Capabilities::FILE_TO_APP
    }

    async fn setup(&self, _ctx: &PluginContext) -> Result<()> {
        let binary = which::which(DPKG_DEB)
            .map_err(|e| Error::NotFound(format!("{} not available: {}", DPKG_DEB, e)))?;
        debug!("using {}", binary.display());
        *self.binary.write() = Some(binary);
        Ok(())
    }

    async fn file_to_app(&self, ctx: &PluginContext, path: &Path, list: &mut AppList) -> Result<()> {
        if !is_deb(path) {
            return Ok(());
        }
        let binary = self
            .binary
            .read()
            .clone()
            .ok_or_else(|| Error::NotFound(format!("{} not available", DPKG_DEB)))?;

        let file = path.to_string_lossy();
        let output = run_command(ctx, &binary.to_string_lossy(), &[SHOW_FORMAT, "-W", file.as_ref()]).await?;
        let info = parse_deb_info(&output)?;
        debug!("{} is package {} {}", path.display(), info.package, info.version);
        list.add(deb_app(ctx, info).shared());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::keys;

    const CHIRON: &str = "chiron\n1.1-1\nGPL-2.0+\n123\nhttp://127.0.0.1/\nSingle line synopsis\n \
                          This is the first paragraph in the example package control file.\n \
                          .\n \
                          This is the second paragraph.\n";

    #[test]
    fn test_parse_deb_info() {
        let info = parse_deb_info(CHIRON).unwrap();
        assert_eq!(info.package, "chiron");
        assert_eq!(info.version, "1.1-1");
        assert_eq!(info.license.as_deref(), Some("GPL-2.0+"));
        assert_eq!(info.installed_size, Some(123 * 1024));
        assert_eq!(info.homepage.as_deref(), Some("http://127.0.0.1/"));
        assert_eq!(info.summary, "Single line synopsis");
        assert_eq!(
            info.description,
            "This is the first paragraph in the example package control file.\n\
             This is the second paragraph."
        );
    }

    #[test]
    fn test_oversized_installed_size_is_unknown() {
        let info = parse_deb_info("pkg\n1.0\nGPL\n18446744073709551615\n\nsum\n").unwrap();
        assert_eq!(info.package, "pkg");
        assert_eq!(info.installed_size, None);

        let info = parse_deb_info("pkg\n1.0\nGPL\n18014398509481983\n\nsum\n").unwrap();
        assert_eq!(info.installed_size, Some(18_014_398_509_481_983 * 1024));
    }

    #[test]
    fn test_short_output_rejected() {
        let err = parse_deb_info("chiron\n1.1-1\n").unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }

    #[test]
    fn test_optional_fields() {
        let info = parse_deb_info("chiron\n1.1-1\n\n\n\nSynopsis\n").unwrap();
        assert_eq!(info.license, None);
        assert_eq!(info.installed_size, None);
        assert_eq!(info.homepage, None);
        assert_eq!(info.description, "");
    }

    #[test]
    fn test_deb_app() {
        let ctx = PluginContext::detached(NAME);
        let app = deb_app(&ctx, parse_deb_info(CHIRON).unwrap());
        let data = app.read();
        assert_eq!(data.state(), AppState::AvailableLocal);
        assert_eq!(data.kind, AppKind::Generic);
        assert_eq!(data.bundle_kind, BundleKind::Package);
        assert_eq!(data.name(), Some("chiron"));
        assert_eq!(data.source_default(), Some("chiron"));
        assert_eq!(data.size_installed, Some(125_952));
        assert_eq!(data.url(UrlKind::Homepage), Some("http://127.0.0.1/"));
        assert_eq!(data.metadata_str(keys::CREATOR), Some(NAME));
    }

    #[tokio::test]
    async fn test_other_files_ignored() {
        let ctx = PluginContext::detached(NAME);
        let mut list = AppList::new();
        DpkgPlugin::new()
            .file_to_app(&ctx, Path::new("/tmp/chiron.rpm"), &mut list)
            .await
            .unwrap();
        assert!(list.is_empty());
    }
}
