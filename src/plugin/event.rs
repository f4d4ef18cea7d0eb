// src/plugin/event.rs
//! Non-fatal failures recorded during plugin operations

use crate::app::App;
use crate::error::{Error, ErrorCategory};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// A recoverable failure, kept for display after the operation finished
#[derive(Debug, Clone, Serialize)]
pub struct PluginEvent {
    pub plugin: String,
    /// Unique id of the affected app, if the failure concerned one app
    pub app: Option<String>,
    pub category: ErrorCategory,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PluginEvent {
    pub fn new(plugin: &str, app: Option<&App>, error: &Error) -> Self {
        Self {
            plugin: plugin.to_string(),
            app: app.map(App::unique_id),
            category: error.category(),
            message: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Shared, append-only event sink
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PluginEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: PluginEvent) {
        warn!(
            "plugin {} failed{}: {}",
            event.plugin,
            event.app.as_deref().map(|a| format!(" on {}", a)).unwrap_or_default(),
            event.message
        );
        self.push(event);
    }

    /// Append without logging, for copies of events already recorded elsewhere
    pub fn push(&self, event: PluginEvent) {
        self.events.lock().push(event);
    }

    /// Copy of all events recorded so far
    pub fn snapshot(&self) -> Vec<PluginEvent> {
        self.events.lock().clone()
    }

    /// Take all recorded events, leaving the log empty
    pub fn drain(&self) -> Vec<PluginEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
