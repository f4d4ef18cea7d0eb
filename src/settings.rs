// src/settings.rs
//! Settings provider with change notification
//!
//! Components that need user settings receive an `Arc<Settings>` and may
//! subscribe to the keys that change. There is no global settings state.

use crate::config::SettingsSection;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// Repository globs considered official sources
pub const OFFICIAL_REPOS: &str = "official-repos";
/// Repository globs whose packages are all free software
pub const FREE_REPOS: &str = "free-repos";
/// URL describing the free software policy
pub const FREE_REPOS_URL: &str = "free-repos-url";

/// A stored setting value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    String(String),
    StringList(Vec<String>),
    Bool(bool),
}

/// Shared key/value settings store
#[derive(Debug)]
pub struct Settings {
    values: RwLock<HashMap<String, SettingValue>>,
    changes: broadcast::Sender<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            values: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Seed a store from the `[settings]` config section
    pub fn from_config(section: &SettingsSection) -> Self {
        let settings = Self::new();
        settings.set_strv(OFFICIAL_REPOS, section.official_repos.clone());
        settings.set_strv(FREE_REPOS, section.free_repos.clone());
        if let Some(url) = &section.free_repos_url {
            settings.set_string(FREE_REPOS_URL, url.clone());
        }
        settings
    }

    /// Receive the key name of every subsequent change
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.read().get(key).cloned()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.values.read().get(key) {
            Some(SettingValue::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// String list value; missing or mistyped keys read as empty
    pub fn get_strv(&self, key: &str) -> Vec<String> {
        match self.values.read().get(key) {
            Some(SettingValue::StringList(list)) => list.clone(),
            _ => Vec::new(),
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.read().get(key) {
            Some(SettingValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Store a value, notifying subscribers only if it changed
    pub fn set(&self, key: &str, value: SettingValue) -> bool {
        {
            let mut values = self.values.write();
            if values.get(key) == Some(&value) {
                return false;
            }
            values.insert(key.to_string(), value);
        }
        debug!("setting {} changed", key);
        // No receivers is fine
        let _ = self.changes.send(key.to_string());
        true
    }

    pub fn set_string(&self, key: &str, value: impl Into<String>) -> bool {
        self.set(key, SettingValue::String(value.into()))
    }

    pub fn set_strv(&self, key: &str, value: Vec<String>) -> bool {
        self.set(key, SettingValue::StringList(value))
    }

    pub fn set_bool(&self, key: &str, value: bool) -> bool {
        self.set(key, SettingValue::Bool(value))
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = self.values.write().remove(key).is_some();
        if removed {
            let _ = self.changes.send(key.to_string());
        }
        removed
    }
}

/// Tracks whether watched settings changed since the last check
///
/// Plugins keep one of these and call [`SettingsWatch::changed`] at the
/// start of an operation to decide whether cached derived values are stale.
#[derive(Debug)]
pub struct SettingsWatch {
    receiver: parking_lot::Mutex<broadcast::Receiver<String>>,
    keys: Vec<&'static str>,
}

impl SettingsWatch {
    pub fn new(settings: &Settings, keys: &[&'static str]) -> Self {
        Self {
            receiver: parking_lot::Mutex::new(settings.subscribe()),
            keys: keys.to_vec(),
        }
    }

    /// Drain pending notifications, returning true if a watched key changed
    pub fn changed(&self) -> bool {
        let mut receiver = self.receiver.lock();
        let mut changed = false;
        loop {
            match receiver.try_recv() {
                Ok(key) => changed |= self.keys.contains(&key.as_str()),
                // Missed notifications may have included a watched key
                Err(broadcast::error::TryRecvError::Lagged(_)) => changed = true,
                Err(_) => break,
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let settings = Settings::new();
        settings.set_strv(OFFICIAL_REPOS, vec!["fedora".into()]);
        settings.set_string(FREE_REPOS_URL, "https://example.org");
        settings.set_bool("download-updates", true);

        assert_eq!(settings.get_strv(OFFICIAL_REPOS), vec!["fedora"]);
        assert_eq!(settings.get_string(FREE_REPOS_URL).as_deref(), Some("https://example.org"));
        assert_eq!(settings.get_bool("download-updates"), Some(true));
        assert!(settings.get_strv(FREE_REPOS).is_empty());
        assert!(settings.get_string(OFFICIAL_REPOS).is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes_once() {
        let settings = Settings::new();
        let mut rx = settings.subscribe();

        assert!(settings.set_strv(FREE_REPOS, vec!["fedora".into()]));
        assert!(!settings.set_strv(FREE_REPOS, vec!["fedora".into()]));

        assert_eq!(rx.recv().await.unwrap(), FREE_REPOS);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_watch_filters_keys() {
        let settings = Settings::new();
        let watch = SettingsWatch::new(&settings, &[OFFICIAL_REPOS]);
        assert!(!watch.changed());

        settings.set_string(FREE_REPOS_URL, "https://example.org");
        assert!(!watch.changed());

        settings.set_strv(OFFICIAL_REPOS, vec!["updates".into()]);
        assert!(watch.changed());
        assert!(!watch.changed());
    }

    #[test]
    fn test_from_config() {
        let section = SettingsSection {
            official_repos: vec!["fedora".into()],
            free_repos: vec![],
            free_repos_url: Some("https://example.org".into()),
        };
        let settings = Settings::from_config(&section);
        assert_eq!(settings.get_strv(OFFICIAL_REPOS), vec!["fedora"]);
        assert_eq!(settings.get_string(FREE_REPOS_URL).as_deref(), Some("https://example.org"));
    }
}
