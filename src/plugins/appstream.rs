// src/plugins/appstream.rs

//! App catalog backed by JSON files
//!
//! Each configured catalog file holds an `origin` and a list of apps.
//! The plugin answers searches and queries from the catalog, hands out one
//! cached [`App`] per catalog id, and during refine fills blanks in apps
//! whose id it knows and resolves wildcards into catalog apps.
//!
//! ```json
//! {
//!   "origin": "fedora",
//!   "origin_url": "https://fedoraproject.org/",
//!   "apps": [
//!     { "id": "org.gnome.Builder.desktop", "name": "Builder", "kind": "desktop-app",
//!       "categories": ["Development"], "state": "installed" }
//!   ]
//! }
//! ```

use crate::app::{
    App, AppData, AppKind, AppList, AppScope, AppState, BundleKind, Icon, KeyColor,
    MetadataValue, Quality, UpdateUrgency, UrlKind,
};
use crate::error::{Error, Result};
use crate::plugin::{Capabilities, Plugin, PluginContext, RefineFlags, RefineJobFlags, RefreshFlags};
use crate::query::{AppQuery, QueryFilters};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const NAME: &str = "appstream";

/// Filters `list_apps` can serve from the catalog
const SUPPORTED_FILTERS: QueryFilters = QueryFilters::KEYWORDS
    .union(QueryFilters::CATEGORY)
    .union(QueryFilters::IS_FEATURED)
    .union(QueryFilters::IS_INSTALLED)
    .union(QueryFilters::IS_FOR_UPDATE);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogState {
    #[default]
    Available,
    Installed,
    Updatable,
}

/// One app as described by a catalog file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub id: String,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub kind: AppKind,
    pub bundle: BundleKind,
    pub scope: AppScope,
    pub state: CatalogState,
    pub version: Option<String>,
    pub update_version: Option<String>,
    pub update_details: Option<String>,
    pub urgency: UpdateUrgency,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
    pub featured: bool,
    pub icons: Vec<Icon>,
    pub key_colors: Vec<KeyColor>,
    pub urls: BTreeMap<UrlKind, String>,
    pub screenshots: Vec<String>,
    pub sources: Vec<String>,
    pub source_ids: Vec<String>,
    pub size_installed: Option<u64>,
    pub size_download: Option<u64>,
    pub metadata: BTreeMap<String, MetadataValue>,

    /// Filled from the enclosing catalog
    #[serde(skip)]
    pub origin: Option<String>,
    #[serde(skip)]
    pub origin_hostname: Option<String>,
}

impl CatalogEntry {
    /// Case-insensitive substring match on id, name, summary or keywords
    fn matches_term(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        let hit = |field: &str| field.to_lowercase().contains(&term);
        hit(self.id.as_str())
            || self.name.as_deref().is_some_and(hit)
            || self.summary.as_deref().is_some_and(hit)
            || self.keywords.iter().any(|k| hit(k.as_str()))
    }

    fn matches_query(&self, query: &AppQuery) -> bool {
        if let Some(keywords) = &query.keywords {
            if !keywords.iter().all(|k| self.matches_term(k)) {
                return false;
            }
        }
        if let Some(category) = &query.category {
            if !self.categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                return false;
            }
        }
        if query.is_featured.is_some_and(|f| f != self.featured) {
            return false;
        }
        let installed = self.state != CatalogState::Available;
        if query.is_installed.is_some_and(|i| i != installed) {
            return false;
        }
        let updatable = self.state == CatalogState::Updatable;
        if query.is_for_update.is_some_and(|u| u != updatable) {
            return false;
        }
        true
    }

    /// Fill the blanks of `data` from this entry
    ///
    /// Text fields are written with normal quality, so higher quality
    /// values set by other plugins survive.
    pub fn apply(&self, data: &mut AppData) {
        data.set_id(self.id.clone());
        if let Some(name) = &self.name {
            data.set_name(Quality::Normal, name.clone());
        }
        if let Some(summary) = &self.summary {
            data.set_summary(Quality::Normal, summary.clone());
        }
        if let Some(description) = &self.description {
            data.set_description(Quality::Normal, description.clone());
        }
        if let Some(license) = &self.license {
            data.set_license(Quality::Normal, license.clone());
        }
        if data.kind == AppKind::Unknown {
            data.kind = self.kind;
        }
        if data.bundle_kind == BundleKind::Unknown {
            data.bundle_kind = self.bundle;
        }
        if data.scope == AppScope::Unknown {
            data.scope = self.scope;
        }
        if data.state() == AppState::Unknown {
            match self.state {
                CatalogState::Available => {
                    data.set_state(AppState::Available);
                }
                CatalogState::Installed => {
                    data.set_state(AppState::Installed);
                }
                CatalogState::Updatable => {
                    data.set_state(AppState::Installed);
                    data.set_state(AppState::Updatable);
                }
            }
        }
        if data.update_urgency == UpdateUrgency::Unknown {
            data.update_urgency = self.urgency;
        }

        fill(&mut data.version, &self.version);
        fill(&mut data.update_version, &self.update_version);
        fill(&mut data.update_details, &self.update_details);
        fill(&mut data.origin, &self.origin);
        fill(&mut data.origin_hostname, &self.origin_hostname);
        fill(&mut data.size_installed, &self.size_installed);
        fill(&mut data.size_download, &self.size_download);

        for category in &self.categories {
            if !data.has_category(category) {
                data.categories.push(category.clone());
            }
        }
        if data.icons.is_empty() {
            data.icons = self.icons.clone();
        }
        if data.key_colors.is_empty() {
            data.key_colors = self.key_colors.clone();
        }
        if data.screenshots.is_empty() {
            data.screenshots = self.screenshots.clone();
        }
        for (kind, url) in &self.urls {
            if data.url(*kind).is_none() {
                data.set_url(*kind, url.clone());
            }
        }
        for source in &self.sources {
            data.add_source(source.clone());
        }
        for source_id in &self.source_ids {
            data.add_source_id(source_id.clone());
        }
        for (key, value) in &self.metadata {
            if data.metadata(key).is_none() {
                data.set_metadata(key, value.clone());
            }
        }
    }
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    origin: Option<String>,
    origin_url: Option<String>,
    #[serde(default)]
    apps: Vec<CatalogEntry>,
}

/// Parse one catalog file's content
pub fn parse_catalog(content: &str) -> Result<Vec<CatalogEntry>> {
    let file: CatalogFile = serde_json::from_str(content)?;
    let hostname = file
        .origin_url
        .as_deref()
        .and_then(|u| url::Url::parse(u).ok())
        .and_then(|u| u.host_str().map(str::to_string));

    let mut entries = Vec::with_capacity(file.apps.len());
    for mut entry in file.apps {
        if entry.id.is_empty() {
            return Err(Error::DataFormat("catalog entry without id".to_string()));
        }
        entry.origin = file.origin.clone();
        entry.origin_hostname = hostname.clone();
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Default)]
struct Catalog {
    entries: Vec<CatalogEntry>,
    loaded_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct AppstreamPlugin {
    catalog: RwLock<Catalog>,
}

impl AppstreamPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog with entries already parsed
    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            catalog: RwLock::new(Catalog {
                entries,
                loaded_at: Some(Instant::now()),
            }),
        }
    }

    async fn load(&self, paths: &[PathBuf]) -> Result<usize> {
        let mut entries = Vec::new();
        for path in paths {
            match read_catalog(path).await {
                Ok(mut loaded) => {
                    debug!("loaded {} catalog entries from {}", loaded.len(), path.display());
                    entries.append(&mut loaded);
                }
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("catalog {} does not exist", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        let count = entries.len();
        *self.catalog.write() = Catalog {
            entries,
            loaded_at: Some(Instant::now()),
        };
        Ok(count)
    }

    fn lookup(&self, id: &str) -> Option<CatalogEntry> {
        self.catalog.read().entries.iter().find(|e| e.id == id).cloned()
    }

    fn select(&self, keep: impl Fn(&CatalogEntry) -> bool) -> Vec<CatalogEntry> {
        self.catalog
            .read()
            .entries
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect()
    }

    /// The cached app for `entry`
    fn app_for(&self, ctx: &PluginContext, entry: &CatalogEntry) -> Arc<App> {
        ctx.cache().get_or_insert_with(&entry.id, || {
            let app = ctx.new_app(Some(&entry.id));
            app.update(|data| entry.apply(data));
            app
        })
    }
}

async fn read_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_catalog(&content)
        .map_err(|e| Error::DataFormat(format!("catalog {}: {}", path.display(), e)))
}

#[async_trait]
impl Plugin for AppstreamPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP
            | Capabilities::SEARCH
            | Capabilities::LIST_APPS
            | Capabilities::REFINE
            | Capabilities::REFRESH
    }

    async fn setup(&self, ctx: &PluginContext) -> Result<()> {
        let paths = &ctx.config().catalog.paths;
        if paths.is_empty() {
            return Ok(());
        }
        let count = self.load(paths).await?;
        info!("appstream catalog has {} apps", count);
        Ok(())
    }

    async fn search(&self, ctx: &PluginContext, values: &[String], list: &mut AppList) -> Result<()> {
        for entry in self.select(|e| values.iter().all(|v| e.matches_term(v))) {
            ctx.check_cancelled()?;
            list.add(self.app_for(ctx, &entry));
        }
        Ok(())
    }

    async fn list_apps(&self, ctx: &PluginContext, query: &AppQuery, list: &mut AppList) -> Result<()> {
        query.ensure_supported(SUPPORTED_FILTERS)?;
        for entry in self.select(|e| e.matches_query(query)) {
            ctx.check_cancelled()?;
            list.add(self.app_for(ctx, &entry));
        }
        Ok(())
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        for app in list.as_slice().to_vec() {
            ctx.check_cancelled()?;

            if app.is_wildcard() {
                let matches = {
                    let wildcard = app.read();
                    self.select(|e| wildcard.wildcard_matches(&e.id))
                };
                let mut resolved = false;
                for entry in matches {
                    let concrete = self.app_for(ctx, &entry);
                    if resolved {
                        list.add(concrete);
                    } else {
                        resolved = list.replace_wildcard(&app, concrete);
                    }
                }
                continue;
            }

            let Some(id) = app.id() else {
                continue;
            };
            if let Some(entry) = self.lookup(&id) {
                app.update(|data| entry.apply(data));
            }
        }
        Ok(())
    }

    async fn refresh(&self, ctx: &PluginContext, cache_age: Duration, _flags: RefreshFlags) -> Result<()> {
        let fresh = self
            .catalog
            .read()
            .loaded_at
            .is_some_and(|at| at.elapsed() < cache_age);
        if fresh {
            debug!("appstream catalog is fresh");
            return Ok(());
        }
        let count = self.load(&ctx.config().catalog.paths).await?;
        info!("reloaded appstream catalog, {} apps", count);
        Ok(())
    }
}
