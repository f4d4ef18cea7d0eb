// src/plugin/mod.rs
//! Plugin capability interface
//!
//! A plugin is a value implementing [`Plugin`]. It declares which operations
//! it implements through [`Plugin::capabilities`], which the registry checks
//! when the plugin is registered; unimplemented operations keep their
//! default body, which returns [`Error::NotSupported`].
//!
//! Ordering between plugins is declared with [`PluginRule`]s naming other
//! plugins. Rules naming plugins that are absent or disabled are ignored.

pub mod cache;
pub mod context;
pub mod event;
pub mod flags;
pub mod helpers;
pub mod registry;

pub use cache::PluginCache;
pub use context::{PluginContext, SharedContext};
pub use event::{EventLog, PluginEvent};
pub use flags::{RefineFlags, RefineJobFlags, RefreshFlags};
pub use registry::{PluginEntry, PluginRegistry};

use crate::app::{AppList, Category};
use crate::bitset::bitset;
use crate::error::{Error, Result};
use crate::query::AppQuery;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

bitset! {
    /// Operations a plugin implements
    pub struct Capabilities: u32 {
        const SETUP = 1 << 0;
        const SHUTDOWN = 1 << 1;
        const SEARCH = 1 << 2;
        const LIST_APPS = 1 << 3;
        const REFINE = 1 << 4;
        const FILE_TO_APP = 1 << 5;
        const REFRESH = 1 << 6;
        const LIST_CATEGORIES = 1 << 7;
    }
}

/// A declared relationship with another plugin, by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PluginRule {
    /// This plugin must run before the named one
    RunBefore(String),
    /// This plugin must run after the named one
    RunAfter(String),
    /// The named plugin is disabled when this one is enabled
    Conflicts(String),
    /// Apps from this plugin are preferred over the named one's
    BetterThan(String),
}

impl PluginRule {
    pub fn run_before(name: &str) -> Self {
        PluginRule::RunBefore(name.to_string())
    }

    pub fn run_after(name: &str) -> Self {
        PluginRule::RunAfter(name.to_string())
    }

    pub fn conflicts(name: &str) -> Self {
        PluginRule::Conflicts(name.to_string())
    }

    pub fn better_than(name: &str) -> Self {
        PluginRule::BetterThan(name.to_string())
    }

    /// Name of the other plugin this rule refers to
    pub fn target(&self) -> &str {
        match self {
            PluginRule::RunBefore(name)
            | PluginRule::RunAfter(name)
            | PluginRule::Conflicts(name)
            | PluginRule::BetterThan(name) => name,
        }
    }
}

/// A unit of functionality driven by the plugin loader
///
/// All methods receive a [`PluginContext`] carrying the cancellation token,
/// the plugin's cache and shared services. Long-running implementations
/// must check [`PluginContext::check_cancelled`] at their suspension points.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// Operations implemented by this plugin
    fn capabilities(&self) -> Capabilities;

    /// Ordering and preference rules
    fn rules(&self) -> Vec<PluginRule> {
        Vec::new()
    }

    /// Prepare the plugin; an error disables it
    async fn setup(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// Add apps matching all of `values` to `list`
    async fn search(&self, _ctx: &PluginContext, _values: &[String], _list: &mut AppList) -> Result<()> {
        Err(not_supported(self.name(), "search"))
    }

    /// Add apps matching `query` to `list`
    ///
    /// Filters the plugin does not understand must be rejected with
    /// [`Error::UnsupportedQuery`].
    async fn list_apps(&self, _ctx: &PluginContext, _query: &AppQuery, _list: &mut AppList) -> Result<()> {
        Err(not_supported(self.name(), "list_apps"))
    }

    /// Enrich the apps in `list` in place
    ///
    /// Failures affecting a single app should be recorded with
    /// [`PluginContext::record_failure`]; returning an error fails the
    /// whole refine call.
    async fn refine(
        &self,
        _ctx: &PluginContext,
        _list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        Err(not_supported(self.name(), "refine"))
    }

    /// Create apps describing a local file
    async fn file_to_app(&self, _ctx: &PluginContext, _path: &Path, _list: &mut AppList) -> Result<()> {
        Err(not_supported(self.name(), "file_to_app"))
    }

    /// Refresh data older than `cache_age`
    async fn refresh(&self, _ctx: &PluginContext, _cache_age: Duration, _flags: RefreshFlags) -> Result<()> {
        Err(not_supported(self.name(), "refresh"))
    }

    /// Add or extend top-level categories
    async fn list_categories(&self, _ctx: &PluginContext, _categories: &mut Vec<Category>) -> Result<()> {
        Err(not_supported(self.name(), "list_categories"))
    }
}

fn not_supported(plugin: &str, operation: &str) -> Error {
    Error::NotSupported(format!("{} does not implement {}", plugin, operation))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    #[async_trait]
    impl Plugin for Bare {
        fn name(&self) -> &str {
            "bare"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::empty()
        }
    }

    #[tokio::test]
    async fn test_default_operations_are_not_supported() {
        let ctx = PluginContext::detached("bare");
        let mut list = AppList::new();
        let err = Bare.search(&ctx, &["foo".into()], &mut list).await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
        assert!(err.to_string().contains("bare does not implement search"));
        assert!(Bare.setup(&ctx).await.is_ok());
    }

    #[test]
    fn test_rule_target() {
        assert_eq!(PluginRule::run_after("appstream").target(), "appstream");
        assert_eq!(PluginRule::conflicts("packagekit").target(), "packagekit");
    }
}
