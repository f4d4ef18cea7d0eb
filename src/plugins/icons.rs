// src/plugins/icons.rs

//! Load icon pixels through the configured resolver

use crate::app::{App, AppList, Icon};
use crate::error::{Error, Result};
use crate::icon::IconRequest;
use crate::plugin::helpers::for_each_app;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "icons";

/// Logical size requested for app icons
pub const ICON_SIZE: u32 = 64;

#[derive(Debug, Default)]
pub struct IconsPlugin;

impl IconsPlugin {
    pub fn new() -> Self {
        Self
    }
}

/// The icon to load for `app`, if it has none loaded yet
///
/// Icons at least [`ICON_SIZE`] wide are preferred over smaller ones.
fn wanted_icon(app: &App) -> Option<Icon> {
    let data = app.read();
    if data.pixbuf.is_some() {
        return None;
    }
    data.icons
        .iter()
        .find(|icon| icon.width >= ICON_SIZE)
        .or_else(|| data.icons.first())
        .cloned()
}

#[async_trait]
impl Plugin for IconsPlugin {
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
        if ctx.icon_resolver().is_none() {
            return Err(Error::Configuration("no icon resolver configured".to_string()));
        }
        Ok(())
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::ICON) {
            return Ok(());
        }
        let Some(resolver) = ctx.icon_resolver() else {
            return Ok(());
        };

        let apps: Vec<Arc<App>> = list.iter().filter(|a| wanted_icon(a).is_some()).cloned().collect();
        debug!("loading icons for {} apps", apps.len());

        for_each_app(ctx, apps, |app| {
            let resolver = resolver.clone();
            async move {
                let Some(icon) = wanted_icon(&app) else {
                    return Ok(());
                };
                let request = IconRequest {
                    icon,
                    size: ICON_SIZE,
                    scale: 1,
                };
                let pixbuf = resolver.resolve(&request).await?;
                app.update(|data| {
                    if data.pixbuf.is_none() {
                        data.pixbuf = Some(Arc::new(pixbuf));
                    }
                });
                Ok(())
            }
        })
        .await?;
        Ok(())
    }
}
