// tests/common/mod.rs

//! Stub plugins and loader helpers for integration tests.

#![allow(dead_code)]

use appcenter::app::AppList;
use appcenter::plugin::{Capabilities, Plugin, PluginContext, PluginRegistry, PluginRule};
use appcenter::plugin::{RefineFlags, RefineJobFlags, SharedContext};
use appcenter::query::{AppQuery, QueryFilters};
use appcenter::{App, AppState, Error, PluginLoader, Quality, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Names of plugins in the order their refine ran
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

/// Refine-only plugin that records when it runs
pub struct TracePlugin {
    name: String,
    rules: Vec<PluginRule>,
    trace: Trace,
}

impl TracePlugin {
    pub fn new(name: &str, rules: Vec<PluginRule>, trace: &Trace) -> Arc<dyn Plugin> {
        Arc::new(Self {
            name: name.to_string(),
            rules,
            trace: trace.clone(),
        })
    }
}

#[async_trait]
impl Plugin for TracePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        self.rules.clone()
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        _list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        self.trace.lock().push(self.name.clone());
        Ok(())
    }
}

/// Catalog stub: lists fixed apps and resolves wildcards for known ids
pub struct CatalogPlugin {
    name: String,
    apps: Vec<(&'static str, &'static str)>,
}

impl CatalogPlugin {
    /// `apps` are `(id, name)` pairs
    pub fn new(name: &str, apps: Vec<(&'static str, &'static str)>) -> Arc<dyn Plugin> {
        Arc::new(Self {
            name: name.to_string(),
            apps,
        })
    }

    fn make_app(&self, ctx: &PluginContext, id: &str, name: &str) -> Arc<App> {
        let app = ctx.new_app(Some(id));
        app.update(|data| {
            data.set_name(Quality::Normal, name);
            data.set_state(AppState::Available);
        });
        app.shared()
    }
}

#[async_trait]
impl Plugin for CatalogPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEARCH | Capabilities::LIST_APPS | Capabilities::REFINE
    }

    async fn search(&self, ctx: &PluginContext, values: &[String], list: &mut AppList) -> Result<()> {
        for (id, name) in &self.apps {
            let haystack = format!("{} {}", id, name).to_lowercase();
            if values.iter().all(|v| haystack.contains(&v.to_lowercase())) {
                list.add(self.make_app(ctx, id, name));
            }
        }
        Ok(())
    }

    async fn list_apps(&self, ctx: &PluginContext, query: &AppQuery, list: &mut AppList) -> Result<()> {
        query.ensure_supported(QueryFilters::IS_FEATURED)?;
        for (id, name) in &self.apps {
            list.add(self.make_app(ctx, id, name));
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
        for wildcard in list.wildcards() {
            let Some(id) = wildcard.id() else {
                continue;
            };
            if let Some((id, name)) = self.apps.iter().find(|(known, _)| *known == id) {
                let concrete = self.make_app(ctx, id, name);
                list.replace_wildcard(&wildcard, concrete);
            }
        }
        Ok(())
    }
}

/// Plugin whose refine never finishes on its own
pub struct StuckPlugin;

#[async_trait]
impl Plugin for StuckPlugin {
    fn name(&self) -> &str {
        "stuck"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        _list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Plugin whose refine always fails with `error`
pub struct FailingPlugin {
    pub name: &'static str,
    pub error: fn() -> Error,
}

#[async_trait]
impl Plugin for FailingPlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        _list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        Err((self.error)())
    }
}

/// Plugin that fails to refine every app, pausing between apps
pub struct FlakyPlugin;

#[async_trait]
impl Plugin for FlakyPlugin {
    fn name(&self) -> &str {
        "flaky"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        for app in list.iter() {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ctx.record_failure(Some(app), &Error::Download("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Loader over `plugins`, set up and ready to use
pub async fn loader_with(plugins: Vec<Arc<dyn Plugin>>) -> PluginLoader {
    let mut registry = PluginRegistry::new();
    for plugin in plugins {
        registry.register(plugin).unwrap();
    }
    let mut loader = PluginLoader::with_registry(registry, SharedContext::default());
    loader.setup(&CancellationToken::new()).await.unwrap();
    loader
}

/// List holding one wildcard per id
pub fn wildcards(ids: &[&str]) -> AppList {
    let mut list = AppList::new();
    for id in ids {
        list.add(App::wildcard(*id).shared());
    }
    list
}
