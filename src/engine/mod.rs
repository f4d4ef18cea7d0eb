// src/engine/mod.rs

//! Plugin loader: the entry point for every operation
//!
//! The loader owns the plugin registry and the services shared by all
//! plugins. After [`PluginLoader::setup`] has resolved the plugin order,
//! listing operations run each capable plugin in turn into one shared
//! [`AppList`], then refine, deduplicate and truncate the result.
//!
//! Error policy for listing operations:
//! - `UnsupportedQuery` / `NotSupported`: the plugin is skipped for this call
//! - transient I/O failures: recorded as a [`PluginEvent`], the call continues
//! - cancellation: returned as is
//! - anything else: the call fails with the error wrapped in the plugin name

pub mod refine;

pub use refine::{PluginRun, RefineReport, RefinementEngine};

use crate::app::{AppList, Category, DedupFlags};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::icon::IconResolver;
use crate::os_release::OsRelease;
use crate::plugin::helpers::cancellable;
use crate::plugin::registry::PluginState;
use crate::plugin::{
    Capabilities, EventLog, Plugin, PluginContext, PluginEvent, PluginRegistry, RefineFlags,
    RefineJobFlags, RefreshFlags, SharedContext,
};
use crate::plugins::history::HistoryProvider;
use crate::query::AppQuery;
use crate::settings::Settings;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A listing operation and its arguments
enum Listing<'q> {
    Search(&'q [String]),
    ListApps(&'q AppQuery),
    FileToApp(&'q Path),
}

impl Listing<'_> {
    fn capability(&self) -> Capabilities {
        match self {
            Listing::Search(_) => Capabilities::SEARCH,
            Listing::ListApps(_) => Capabilities::LIST_APPS,
            Listing::FileToApp(_) => Capabilities::FILE_TO_APP,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Listing::Search(_) => "search",
            Listing::ListApps(_) => "list-apps",
            Listing::FileToApp(_) => "file-to-app",
        }
    }

    async fn call(&self, plugin: &dyn Plugin, ctx: &PluginContext, list: &mut AppList) -> Result<()> {
        match self {
            Listing::Search(values) => plugin.search(ctx, values, list).await,
            Listing::ListApps(query) => plugin.list_apps(ctx, query, list).await,
            Listing::FileToApp(path) => plugin.file_to_app(ctx, path, list).await,
        }
    }
}

pub struct PluginLoader {
    registry: PluginRegistry,
    shared: Arc<SharedContext>,
    set_up: bool,
}

impl PluginLoader {
    /// Loader with all built-in plugins, configured from `config`
    ///
    /// os-release is read from the configured path or the default
    /// locations; a missing file leaves plugins that need it disabled.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let os_release = match OsRelease::load_default(config.os_release.path.as_deref()) {
            Ok(release) => Some(Arc::new(release)),
            Err(e) => {
                debug!("os-release unavailable: {}", e);
                None
            }
        };
        let shared = SharedContext {
            settings: Arc::new(Settings::from_config(&config.settings)),
            config: Arc::new(config),
            events: EventLog::new(),
            os_release,
            icon_resolver: None,
            history_provider: None,
        };
        Ok(Self::with_registry(PluginRegistry::with_builtins()?, shared))
    }

    /// Loader over an explicit set of plugins
    pub fn with_registry(registry: PluginRegistry, shared: SharedContext) -> Self {
        Self {
            registry,
            shared: Arc::new(shared),
            set_up: false,
        }
    }

    pub fn with_icon_resolver(mut self, resolver: Arc<dyn IconResolver>) -> Self {
        Arc::make_mut(&mut self.shared).icon_resolver = Some(resolver);
        self
    }

    pub fn with_history_provider(mut self, provider: Arc<dyn HistoryProvider>) -> Self {
        Arc::make_mut(&mut self.shared).history_provider = Some(provider);
        self
    }

    pub fn with_os_release(mut self, release: OsRelease) -> Self {
        Arc::make_mut(&mut self.shared).os_release = Some(Arc::new(release));
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn shared(&self) -> &Arc<SharedContext> {
        &self.shared
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.shared.settings
    }

    /// Select, order and set up the plugins
    ///
    /// A plugin whose setup fails is disabled; the others carry on. An
    /// ordering cycle fails the whole setup.
    pub async fn setup(&mut self, cancel: &CancellationToken) -> Result<()> {
        let config = self.shared.config.clone();
        self.registry
            .apply_name_filters(&config.plugins.allowlist, &config.plugins.blocklist);
        self.registry.apply_conflicts();
        let order = self.registry.resolve_order()?;
        info!("setting up {} plugins", order.len());

        for name in order {
            let Some(entry) = self.registry.get(&name) else {
                continue;
            };
            if !entry.implements(Capabilities::SETUP) {
                continue;
            }
            let ctx = entry.context(&self.shared, cancel);
            let plugin = entry.plugin().clone();

            let started = Instant::now();
            match cancellable(&ctx, plugin.setup(&ctx)).await {
                Ok(()) => debug!("{} set up in {:?}", name, started.elapsed()),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!("plugin {} failed to set up: {}", name, e);
                    self.registry.disable(&name, &format!("setup failed: {}", e));
                }
            }
        }

        self.registry.dump_state();
        self.set_up = true;
        Ok(())
    }

    /// Shut plugins down in reverse order; failures are only logged
    pub async fn shutdown(&mut self, cancel: &CancellationToken) {
        if !self.set_up {
            return;
        }
        let entries = self.registry.plugins_implementing(Capabilities::SHUTDOWN);
        for entry in entries.into_iter().rev() {
            let ctx = entry.context(&self.shared, cancel);
            if let Err(e) = entry.plugin().shutdown(&ctx).await {
                warn!("plugin {} failed to shut down: {}", entry.name(), e);
            }
        }
        self.set_up = false;
    }

    /// Apps matching every search term
    pub async fn search(
        &self,
        values: &[String],
        refine_flags: RefineFlags,
        cancel: &CancellationToken,
    ) -> Result<AppList> {
        if values.iter().all(|v| v.trim().is_empty()) {
            return Err(Error::UnsupportedQuery("no search terms given".to_string()));
        }
        let mut list = self.run_listing(Listing::Search(values), cancel).await?;
        self.finish_listing(&mut list, refine_flags, DedupFlags::KEY_ID, cancel)
            .await?;
        Ok(list)
    }

    /// Apps matching `query`
    pub async fn list_apps(&self, query: &AppQuery, cancel: &CancellationToken) -> Result<AppList> {
        if query.filters_set().is_empty() {
            return Err(Error::UnsupportedQuery("query sets no filter".to_string()));
        }
        let mut list = self.run_listing(Listing::ListApps(query), cancel).await?;
        self.finish_listing(&mut list, query.refine_flags, query.dedupe_flags, cancel)
            .await?;
        if let Some(max) = query.max_results {
            list.truncate(max);
        }
        Ok(list)
    }

    /// Apps describing a local file
    pub async fn file_to_app(
        &self,
        path: &Path,
        refine_flags: RefineFlags,
        cancel: &CancellationToken,
    ) -> Result<AppList> {
        let mut list = self.run_listing(Listing::FileToApp(path), cancel).await?;
        if list.is_empty() {
            return Err(Error::NotSupported(format!(
                "no plugin can handle {}",
                path.display()
            )));
        }
        for app in list.iter() {
            app.update(|data| {
                if data.local_file.is_none() {
                    data.local_file = Some(path.to_path_buf());
                }
            });
        }
        self.finish_listing(&mut list, refine_flags, DedupFlags::empty(), cancel)
            .await?;
        Ok(list)
    }

    /// Refresh plugin data older than `cache_age`
    ///
    /// Returns the number of plugins that failed; each failure is recorded
    /// as an event.
    pub async fn refresh(
        &self,
        cache_age: Duration,
        flags: RefreshFlags,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.ensure_set_up()?;
        let mut failed = 0;
        for entry in self.registry.plugins_implementing(Capabilities::REFRESH) {
            let ctx = entry.context(&self.shared, cancel);
            ctx.check_cancelled()?;
            match cancellable(&ctx, entry.plugin().refresh(&ctx, cache_age, flags)).await {
                Ok(()) => debug!("{} refreshed", entry.name()),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if e.is_unsupported() => debug!("{} skipped refresh: {}", entry.name(), e),
                Err(e) => {
                    failed += 1;
                    ctx.record_failure(None, &e);
                }
            }
        }
        Ok(failed)
    }

    /// Top-level categories with their subcategories
    pub async fn list_categories(&self, cancel: &CancellationToken) -> Result<Vec<Category>> {
        self.ensure_set_up()?;
        let mut categories = Vec::new();
        for entry in self.registry.plugins_implementing(Capabilities::LIST_CATEGORIES) {
            let ctx = entry.context(&self.shared, cancel);
            ctx.check_cancelled()?;
            match cancellable(&ctx, entry.plugin().list_categories(&ctx, &mut categories)).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if e.is_unsupported() => {}
                Err(e) if e.is_transient() => ctx.record_failure(None, &e),
                Err(e) => return Err(Error::plugin(entry.name(), e)),
            }
        }
        Ok(categories)
    }

    /// Refine `list` in place
    pub async fn refine(
        &self,
        list: &mut AppList,
        flags: RefineFlags,
        job_flags: RefineJobFlags,
        cancel: &CancellationToken,
    ) -> Result<RefineReport> {
        self.ensure_set_up()?;
        RefinementEngine::new(&self.registry, &self.shared)
            .run(list, flags, job_flags, cancel)
            .await
    }

    /// All non-fatal failures recorded so far
    pub fn events(&self) -> Vec<PluginEvent> {
        self.shared.events.snapshot()
    }

    pub fn clear_events(&self) {
        self.shared.events.drain();
    }

    /// State of every plugin, enabled ones in run order
    pub fn plugin_state(&self) -> Vec<PluginState> {
        self.registry.dump_state()
    }

    fn ensure_set_up(&self) -> Result<()> {
        if !self.set_up {
            return Err(Error::Configuration(
                "plugin loader used before setup".to_string(),
            ));
        }
        Ok(())
    }

    async fn run_listing(&self, listing: Listing<'_>, cancel: &CancellationToken) -> Result<AppList> {
        self.ensure_set_up()?;
        let mut list = AppList::new();
        for entry in self.registry.plugins_implementing(listing.capability()) {
            let ctx = entry.context(&self.shared, cancel);
            ctx.check_cancelled()?;

            let result = cancellable(&ctx, listing.call(entry.plugin().as_ref(), &ctx, &mut list)).await;
            match result {
                Ok(()) => debug!("{} {}: {} apps so far", entry.name(), listing.name(), list.len()),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if e.is_unsupported() => {
                    debug!("{} skipped {}: {}", entry.name(), listing.name(), e)
                }
                Err(e) if e.is_transient() => ctx.record_failure(None, &e),
                Err(e) => return Err(Error::plugin(entry.name(), e)),
            }
        }
        Ok(list)
    }

    /// Refine a listing result, drop unresolved wildcards and duplicates
    async fn finish_listing(
        &self,
        list: &mut AppList,
        flags: RefineFlags,
        dedupe: DedupFlags,
        cancel: &CancellationToken,
    ) -> Result<()> {
        RefinementEngine::new(&self.registry, &self.shared)
            .run(list, flags, RefineJobFlags::FILTER_WILDCARDS, cancel)
            .await?;
        list.retain(|app| !app.is_wildcard());
        if !dedupe.is_empty() {
            list.filter_duplicates(dedupe);
        }
        Ok(())
    }
}
