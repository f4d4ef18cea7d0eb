// src/plugins/featured.rs

//! Fallback featured apps with custom tile styling
//!
//! When other plugins found fewer than [`MIN_FEATURED`] featured apps, a
//! fixed set is added as wildcards for the catalog to resolve. Refine puts
//! the tile CSS on matching apps regardless of where they came from.

use crate::app::{keys, App, AppList};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use crate::query::{AppQuery, QueryFilters};
use async_trait::async_trait;
use tracing::debug;

pub const NAME: &str = "hardcoded-featured";

/// Below this many featured apps the hardcoded set is added
pub const MIN_FEATURED: usize = 9;

const FEATURED: &[(&str, &str)] = &[(
    "org.gnome.Builder.desktop",
    "border-color: #000000;\n\
     text-shadow: 0 1px 1px rgba(0,0,0,0.5);\n\
     color: #ffffff;\n\
     outline-offset: 0;\n\
     outline-color: alpha(#ffffff, 0.75);\n\
     outline-style: dashed;\n\
     outline-offset: 2px;\n\
     background: url('/usr/share/appcenter/featured-builder.png') left center / 100% auto no-repeat, \
     url('/usr/share/appcenter/featured-builder-bg.jpg') center / cover no-repeat;",
)];

#[derive(Debug, Default)]
pub struct FeaturedPlugin;

impl FeaturedPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for FeaturedPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIST_APPS | Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::appstream::NAME)]
    }

    async fn list_apps(&self, ctx: &PluginContext, query: &AppQuery, list: &mut AppList) -> Result<()> {
        query.ensure_supported(QueryFilters::IS_FEATURED)?;
        if query.is_featured != Some(true) || list.len() >= MIN_FEATURED {
            return Ok(());
        }

        debug!("adding hardcoded featured apps, only {} found", list.len());
        for (id, css) in FEATURED {
            let app = ctx.cache().get_or_insert_with(id, || {
                let app = App::wildcard(*id);
                app.set_metadata(keys::CREATOR, ctx.plugin_name());
                app.set_metadata(keys::FEATURE_TILE_CSS, *css);
                app
            });
            list.add(app);
        }
        Ok(())
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
                let Some(&(_, css)) = FEATURED.iter().find(|(id, _)| data.id() == Some(*id)) else {
                    return;
                };
                if data.metadata(keys::FEATURE_TILE_CSS).is_none() {
                    data.set_metadata(keys::FEATURE_TILE_CSS, css);
                }
            });
        }
        Ok(())
    }
}
