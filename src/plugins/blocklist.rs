// src/plugins/blocklist.rs

//! Hide apps that should never be shown, matched by id glob

use super::compile_globs;
use crate::app::{AppList, Quirks};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use glob::Pattern;

pub const NAME: &str = "hardcoded-blocklist";

const APP_GLOBS: &[&str] = &[
    "freeciv-server.desktop",
    "links.desktop",
    "nm-connection-editor.desktop",
    "plank.desktop",
    "*release-notes*.desktop",
    "*Release_Notes*.desktop",
    "Rodent-*.desktop",
    "rygel-preferences.desktop",
    "system-config-keyboard.desktop",
    "tracker-preferences.desktop",
    "Uninstall*.desktop",
    "wine-*.desktop",
];

pub struct BlocklistPlugin {
    patterns: Vec<Pattern>,
}

impl BlocklistPlugin {
    pub fn new() -> Self {
        Self {
            patterns: compile_globs(APP_GLOBS),
        }
    }

    fn is_blocked(&self, id: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(id))
    }
}

impl Default for BlocklistPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for BlocklistPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::appstream::NAME)]
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        for app in list.iter() {
            app.update(|data| {
                let blocked = data.id().is_some_and(|id| self.is_blocked(id));
                if blocked {
                    data.add_quirk(Quirks::HIDE_EVERYWHERE);
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;

    #[tokio::test]
    async fn test_blocklisted_ids_are_hidden() {
        let ctx = PluginContext::detached(NAME);
        let mut list = AppList::new();
        for id in ["wine-notepad.desktop", "org.gnome.Maps.desktop", "fedora-release-notes.desktop"] {
            list.add(App::new(id).shared());
        }
        list.add(App::unnamed().shared());

        BlocklistPlugin::new()
            .refine(&ctx, &mut list, RefineFlags::ICON, RefineJobFlags::NONE)
            .await
            .unwrap();

        let hidden: Vec<bool> = list.iter().map(|a| a.has_quirk(Quirks::HIDE_EVERYWHERE)).collect();
        assert_eq!(hidden, vec![true, false, true, false]);
    }

    #[test]
    fn test_globs_are_case_sensitive() {
        let plugin = BlocklistPlugin::new();
        assert!(plugin.is_blocked("Uninstall Foo.desktop"));
        assert!(!plugin.is_blocked("uninstall-foo.desktop"));
        assert!(plugin.is_blocked("GNOME_Release_Notes.desktop"));
    }
}
