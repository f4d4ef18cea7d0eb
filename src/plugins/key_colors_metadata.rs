// src/plugins/key_colors_metadata.rs

//! Substitute `@keycolor-NN@` placeholders in tile CSS with real colors

use crate::app::{keys, AppData, AppList};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;

pub const NAME: &str = "key-colors-metadata";

const PLACEHOLDER: &str = "@keycolor";

#[derive(Debug, Default)]
pub struct KeyColorsMetadataPlugin;

impl KeyColorsMetadataPlugin {
    pub fn new() -> Self {
        Self
    }
}

/// `css` with every `@keycolor-NN@` for a known color replaced
pub fn substitute_key_colors(css: &str, data: &AppData) -> String {
    data.key_colors
        .iter()
        .enumerate()
        .fold(css.to_string(), |css, (i, color)| {
            css.replace(&format!("@keycolor-{:02}@", i), &color.to_css())
        })
}

fn fix_css(data: &mut AppData) {
    if data.key_colors.is_empty() {
        return;
    }
    for key in keys::CSS_KEYS {
        let Some(css) = data.metadata_str(key) else {
            continue;
        };
        if !css.contains(PLACEHOLDER) {
            continue;
        }
        let fixed = substitute_key_colors(css, data);
        if fixed != css {
            data.set_metadata(key, fixed);
        }
    }
}

#[async_trait]
impl Plugin for KeyColorsMetadataPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::key_colors::NAME)]
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::KEY_COLORS) {
            return Ok(());
        }
        for app in list.iter() {
            app.update(fix_css);
        }
        Ok(())
    }
}
