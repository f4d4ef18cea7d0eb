// src/plugin/context.rs
//! Context handed to every plugin operation

use super::cache::PluginCache;
use super::event::{EventLog, PluginEvent};
use crate::app::{keys, App};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::icon::IconResolver;
use crate::os_release::OsRelease;
use crate::plugins::history::HistoryProvider;
use crate::settings::Settings;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Services shared by all plugins of one loader
#[derive(Clone, Default)]
pub struct SharedContext {
    pub config: Arc<Config>,
    pub settings: Arc<Settings>,
    pub events: EventLog,
    pub os_release: Option<Arc<OsRelease>>,
    pub icon_resolver: Option<Arc<dyn IconResolver>>,
    pub history_provider: Option<Arc<dyn HistoryProvider>>,
}

/// Per-call view of the loader for one plugin
#[derive(Clone)]
pub struct PluginContext {
    plugin: String,
    priority: i32,
    cache: Arc<PluginCache>,
    shared: Arc<SharedContext>,
    cancel: CancellationToken,
    /// Events of the job this call belongs to, kept apart from other jobs
    job_events: Option<EventLog>,
}

impl PluginContext {
    pub fn new(
        plugin: &str,
        priority: i32,
        cache: Arc<PluginCache>,
        shared: Arc<SharedContext>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            plugin: plugin.to_string(),
            priority,
            cache,
            shared,
            cancel,
            job_events: None,
        }
    }

    /// A context with default services, for driving a plugin on its own
    pub fn detached(plugin: &str) -> Self {
        Self::new(
            plugin,
            0,
            Arc::new(PluginCache::new()),
            Arc::new(SharedContext::default()),
            CancellationToken::new(),
        )
    }

    /// Same plugin and services, different cancellation token
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// Also record failures into `events`, the log of a single job
    pub fn with_job_events(self, events: EventLog) -> Self {
        Self {
            job_events: Some(events),
            ..self
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn cache(&self) -> &PluginCache {
        &self.cache
    }

    pub fn shared(&self) -> &SharedContext {
        &self.shared
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.shared.settings
    }

    pub fn events(&self) -> &EventLog {
        &self.shared.events
    }

    pub fn os_release(&self) -> Option<&OsRelease> {
        self.shared.os_release.as_deref()
    }

    pub fn icon_resolver(&self) -> Option<&Arc<dyn IconResolver>> {
        self.shared.icon_resolver.as_ref()
    }

    pub fn history_provider(&self) -> Option<&Arc<dyn HistoryProvider>> {
        self.shared.history_provider.as_ref()
    }

    pub fn max_concurrency(&self) -> usize {
        self.shared.config.plugins.max_concurrency.max(1)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Create an app owned by this plugin
    ///
    /// The app carries the plugin's priority and is tagged with the plugin
    /// as its creator.
    pub fn new_app(&self, id: Option<&str>) -> App {
        let app = match id {
            Some(id) => App::new(id),
            None => App::unnamed(),
        };
        app.update(|data| {
            data.priority = self.priority;
            data.management_plugin = Some(self.plugin.clone());
            data.set_metadata(keys::CREATOR, self.plugin.as_str());
        });
        app
    }

    /// Record a non-fatal failure for one app
    ///
    /// Cancellation is not a failure and is not recorded. A deadline hit by
    /// a single sub-operation is.
    pub fn record_failure(&self, app: Option<&App>, error: &Error) {
        if matches!(error, Error::Cancelled) {
            return;
        }
        let event = PluginEvent::new(&self.plugin, app, error);
        if let Some(job) = &self.job_events {
            job.push(event.clone());
        }
        self.shared.events.record(event);
    }
}
