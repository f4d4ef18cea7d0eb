// src/plugins/langpacks.rs

//! Offer the Fedora langpack for a locale
//!
//! Only answers queries with the `is-langpack-for-locale` filter. Once a
//! langpack was offered, a marker file in the cache directory stops it
//! being offered again.

use crate::app::{AppKind, AppList};
use crate::error::{Error, Result};
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule};
use crate::query::{AppQuery, QueryFilters};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub const NAME: &str = "fedora-langpacks";

const DISTRO_ID: &str = "fedora";

/// Locales with a region-specific langpack
const REGIONAL_LOCALES: &[&str] = &["en_GB", "pt_BR", "zh_CN", "zh_TW"];

/// Package name of the langpack covering `locale`
///
/// `ja_JP` maps to `langpacks-ja`; locales with their own langpack keep
/// the region, so `pt_BR` maps to `langpacks-pt_BR`.
pub fn langpack_package(locale: &str) -> String {
    let code = match locale.split_once('_') {
        Some((language, _)) if !REGIONAL_LOCALES.contains(&locale) => language,
        _ => locale,
    };
    format!("langpacks-{}", code)
}

#[derive(Debug)]
pub struct LangpacksPlugin {
    marker_dir: Option<PathBuf>,
}

impl LangpacksPlugin {
    pub fn new() -> Self {
        Self {
            marker_dir: dirs::cache_dir().map(|dir| dir.join("appcenter").join("langpacks")),
        }
    }

    /// Keep offered-langpack markers in `dir`
    pub fn with_marker_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            marker_dir: Some(dir.into()),
        }
    }

    async fn already_offered(&self, package: &str) -> bool {
        match &self.marker_dir {
            Some(dir) => tokio::fs::try_exists(dir.join(package)).await.unwrap_or(false),
            None => false,
        }
    }

    async fn mark_offered(&self, package: &str) -> Result<()> {
        let Some(dir) = &self.marker_dir else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(package), package).await?;
        Ok(())
    }
}

impl Default for LangpacksPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for LangpacksPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP | Capabilities::LIST_APPS
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::appstream::NAME)]
    }

    async fn setup(&self, ctx: &PluginContext) -> Result<()> {
        let is_fedora = ctx
            .os_release()
            .is_some_and(|release| release.id.as_deref() == Some(DISTRO_ID));
        if !is_fedora {
            return Err(Error::NotSupported(format!("{} is only used on Fedora", NAME)));
        }
        Ok(())
    }

    async fn list_apps(&self, ctx: &PluginContext, query: &AppQuery, list: &mut AppList) -> Result<()> {
        query.ensure_supported(QueryFilters::IS_LANGPACK_FOR_LOCALE)?;
        let Some(locale) = query.is_langpack_for_locale.as_deref() else {
            return Ok(());
        };

        let package = langpack_package(locale);
        if self.already_offered(&package).await {
            debug!("{} was already offered", package);
            return Ok(());
        }

        let app = ctx.new_app(None);
        app.update(|data| {
            data.kind = AppKind::Localization;
            data.add_source(package.as_str());
        });
        list.add(app.shared());
        self.mark_offered(&package).await
    }
}
