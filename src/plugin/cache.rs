// src/plugin/cache.rs
//! Per-plugin app memoization
//!
//! Each registered plugin owns one [`PluginCache`]. It maps a plugin-chosen
//! key, usually the app id, to a shared app so that repeated queries hand
//! out the same instance. Later refine passes mutate that instance and the
//! changes are visible on the next lookup. Entries never expire; the cache
//! lives as long as the plugin.

use crate::app::App;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct PluginCache {
    entries: RwLock<HashMap<String, Arc<App>>>,
}

impl PluginCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The app stored under `key`
    pub fn lookup(&self, key: &str) -> Option<Arc<App>> {
        self.entries.read().get(key).cloned()
    }

    /// Store `app` under `key`, replacing any previous mapping
    pub fn add(&self, key: &str, app: Arc<App>) {
        let previous = self.entries.write().insert(key.to_string(), app);
        if previous.is_some() {
            debug!("plugin cache entry {} replaced", key);
        }
    }

    /// The app stored under `key`, creating it with `create` if absent
    ///
    /// Concurrent callers for the same key all receive the same instance.
    pub fn get_or_insert_with(&self, key: &str, create: impl FnOnce() -> App) -> Arc<App> {
        if let Some(app) = self.lookup(key) {
            return app;
        }
        let mut entries = self.entries.write();
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(create()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Quirks;

    #[test]
    fn test_lookup_returns_same_instance() {
        let cache = PluginCache::new();
        let app = App::wildcard("org.example.Foo").shared();
        cache.add("org.example.Foo", app.clone());

        let found = cache.lookup("org.example.Foo").unwrap();
        assert!(Arc::ptr_eq(&found, &app));
        assert!(cache.lookup("org.example.Bar").is_none());
    }

    #[test]
    fn test_mutations_visible_through_cache() {
        let cache = PluginCache::new();
        cache.add("foo", App::new("foo").shared());

        cache.lookup("foo").unwrap().add_quirk(Quirks::PROVENANCE);
        assert!(cache.lookup("foo").unwrap().has_quirk(Quirks::PROVENANCE));
    }

    #[test]
    fn test_get_or_insert_with_creates_once() {
        let cache = PluginCache::new();
        let first = cache.get_or_insert_with("system", || App::wildcard("system"));
        let second = cache.get_or_insert_with("system", || panic!("must not create twice"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
