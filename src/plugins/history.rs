// src/plugins/history.rs

//! Install and update history from an external history service
//!
//! The service is reached through a [`HistoryProvider`]. Each query runs
//! under the `[history] timeout` deadline; an expired query is recorded as
//! a failure for that app and the others continue.

use crate::app::{App, AppList, HistoryAction, HistoryEntry};
use crate::error::{Error, Result};
use crate::plugin::helpers::{for_each_app, with_timeout};
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "history";

/// Source of past install, update and remove events
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn history(&self, app_id: &str) -> Result<Vec<HistoryEntry>>;
}

/// Provider backed by a fixed map from app id to entries
#[derive(Debug, Default)]
pub struct StaticHistoryProvider {
    entries: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl StaticHistoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, app_id: impl Into<String>, entries: Vec<HistoryEntry>) {
        self.entries.write().insert(app_id.into(), entries);
    }
}

#[async_trait]
impl HistoryProvider for StaticHistoryProvider {
    async fn history(&self, app_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.read().get(app_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct HistoryPlugin;

impl HistoryPlugin {
    pub fn new() -> Self {
        Self
    }
}

fn needs_history(app: &App) -> bool {
    let data = app.read();
    data.history.is_empty() && !data.is_wildcard() && data.id().is_some()
}

#[async_trait]
impl Plugin for HistoryPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP | Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::appstream::NAME)]
    }

    async fn setup(&self, ctx: &PluginContext) -> Result<()> {
        if ctx.history_provider().is_none() {
            return Err(Error::Configuration("no history provider configured".to_string()));
        }
        ctx.config().history_timeout()?;
        Ok(())
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::HISTORY) {
            return Ok(());
        }
        let Some(provider) = ctx.history_provider() else {
            return Ok(());
        };
        let timeout = ctx.config().history_timeout()?;

        let apps: Vec<Arc<App>> = list.iter().filter(|a| needs_history(a)).cloned().collect();
        debug!("querying history for {} apps", apps.len());

        for_each_app(ctx, apps, |app| {
            let provider = provider.clone();
            async move {
                let Some(id) = app.id() else {
                    return Ok(());
                };
                let mut entries = with_timeout(ctx, timeout, provider.history(&id)).await?;
                entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                let installed = entries
                    .iter()
                    .filter(|e| e.action == HistoryAction::Install)
                    .map(|e| e.timestamp)
                    .max();
                app.update(|data| {
                    if data.history.is_empty() {
                        data.history = entries;
                    }
                    if data.install_date.is_none() {
                        data.install_date = installed;
                    }
                });
                Ok(())
            }
        })
        .await?;
        Ok(())
    }
}
