// src/plugins/mod.rs
//! Built-in plugins
//!
//! Each plugin is a small, self-contained [`Plugin`] implementation. They
//! are registered by [`builtin`] in a fixed order; the order they run in is
//! decided by their rules, not by this list.

pub mod appstream;
pub mod blocklist;
pub mod desktop_categories;
pub mod dpkg;
pub mod featured;
pub mod generic_updates;
pub mod history;
pub mod icons;
pub mod key_colors;
pub mod key_colors_metadata;
pub mod langpacks;
pub mod os_release;
pub mod provenance;
pub mod provenance_license;

use crate::plugin::Plugin;
use crate::settings::{Settings, SettingsWatch};
use glob::Pattern;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Every built-in plugin, in registration order
pub fn builtin() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(appstream::AppstreamPlugin::new()),
        Arc::new(os_release::OsReleasePlugin::new()),
        Arc::new(blocklist::BlocklistPlugin::new()),
        Arc::new(featured::FeaturedPlugin::new()),
        Arc::new(desktop_categories::DesktopCategoriesPlugin::new()),
        Arc::new(provenance::ProvenancePlugin::new()),
        Arc::new(provenance_license::ProvenanceLicensePlugin::new()),
        Arc::new(generic_updates::GenericUpdatesPlugin::new()),
        Arc::new(history::HistoryPlugin::new()),
        Arc::new(icons::IconsPlugin::new()),
        Arc::new(key_colors::KeyColorsPlugin::new()),
        Arc::new(key_colors_metadata::KeyColorsMetadataPlugin::new()),
        Arc::new(dpkg::DpkgPlugin::new()),
        Arc::new(langpacks::LangpacksPlugin::new()),
    ]
}

/// Compile glob patterns, skipping invalid ones with a warning
pub(crate) fn compile_globs<S: AsRef<str>>(patterns: &[S]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|pat| {
            let pat = pat.as_ref();
            Pattern::new(pat)
                .map_err(|e| warn!("ignoring invalid glob '{}': {}", pat, e))
                .ok()
        })
        .collect()
}

pub(crate) fn matches_any(patterns: &[Pattern], value: &str) -> bool {
    patterns.iter().any(|p| p.matches(value))
}

/// A value derived from settings, recomputed when its keys change
pub(crate) struct WatchedSetting<T> {
    keys: Vec<&'static str>,
    derive: fn(&Settings) -> T,
    state: Mutex<Option<(SettingsWatch, Arc<T>)>>,
}

impl<T> WatchedSetting<T> {
    pub(crate) fn new(keys: &[&'static str], derive: fn(&Settings) -> T) -> Self {
        Self {
            keys: keys.to_vec(),
            derive,
            state: Mutex::new(None),
        }
    }

    /// Current value, derived on first use and after any watched change
    pub(crate) fn get(&self, settings: &Arc<Settings>) -> Arc<T> {
        let mut state = self.state.lock();
        if let Some((watch, value)) = state.as_ref() {
            if !watch.changed() {
                return value.clone();
            }
        }
        let watch = match state.take() {
            Some((watch, _)) => watch,
            None => SettingsWatch::new(settings, &self.keys),
        };
        let value = Arc::new((self.derive)(settings));
        *state = Some((watch, value.clone()));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;
    use crate::settings::OFFICIAL_REPOS;

    #[test]
    fn test_builtin_names_are_unique() {
        let mut registry = PluginRegistry::new();
        for plugin in builtin() {
            registry.register(plugin).unwrap();
        }
        assert_eq!(registry.len(), 14);
    }

    #[test]
    fn test_builtin_order_resolves() {
        let mut registry = PluginRegistry::with_builtins().unwrap();
        let order = registry.resolve_order().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

        assert_eq!(order[0], appstream::NAME);
        assert!(pos(generic_updates::NAME) < pos(icons::NAME));
        assert!(pos(icons::NAME) < pos(key_colors::NAME));
        assert!(pos(key_colors::NAME) < pos(key_colors_metadata::NAME));
        assert!(pos(provenance::NAME) < pos(provenance_license::NAME));
    }

    #[test]
    fn test_compile_globs_skips_invalid() {
        let patterns = compile_globs(&["fedora*", "[unclosed", "updates"]);
        assert_eq!(patterns.len(), 2);
        assert!(matches_any(&patterns, "fedora-cisco"));
        assert!(!matches_any(&patterns, "rpmfusion"));
    }

    #[test]
    fn test_watched_setting_rederives_on_change() {
        let settings = Arc::new(Settings::new());
        settings.set_strv(OFFICIAL_REPOS, vec!["fedora".into()]);
        let watched = WatchedSetting::new(&[OFFICIAL_REPOS], |s| s.get_strv(OFFICIAL_REPOS).len());

        let first = watched.get(&settings);
        assert_eq!(*first, 1);
        assert!(Arc::ptr_eq(&first, &watched.get(&settings)));

        settings.set_strv(OFFICIAL_REPOS, vec!["fedora".into(), "updates".into()]);
        assert_eq!(*watched.get(&settings), 2);
    }
}
