// src/plugins/generic_updates.rs

//! Group system package updates that are not apps under one proxy app
//!
//! When update details are requested, every system-scope package in the
//! list that is not a user-facing app is moved into the related list of a
//! single "OS Updates" proxy, which takes the place of those packages.

use crate::app::{ids, App, AppKind, AppList, AppScope, AppState, BundleKind, Icon, Quality, Quirks};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "generic-updates";

const PROXY_NAME: &str = "OS Updates";
const PROXY_SUMMARY: &str = "Includes performance, stability and security improvements.";
const PROXY_ICON: &str = "software-update-available-symbolic";

#[derive(Debug, Default)]
pub struct GenericUpdatesPlugin;

impl GenericUpdatesPlugin {
    pub fn new() -> Self {
        Self
    }
}

/// Whether `app` is a system package update to fold into the proxy
fn is_os_update(app: &App) -> bool {
    let data = app.read();
    !data.is_wildcard()
        && data.bundle_kind == BundleKind::Package
        && data.scope == AppScope::System
        && matches!(data.kind, AppKind::Generic | AppKind::Repository | AppKind::Service)
}

fn os_update_proxy(ctx: &PluginContext) -> App {
    let app = ctx.new_app(Some(ids::OS_UPDATE));
    app.update(|data| {
        data.add_quirk(Quirks::IS_PROXY);
        data.management_plugin = None;
        data.kind = AppKind::OsUpdate;
        data.set_state(AppState::Installed);
        data.set_state(AppState::UpdatableLive);
        data.set_name(Quality::Normal, PROXY_NAME);
        data.set_summary(Quality::Normal, PROXY_SUMMARY);
        data.set_description(Quality::Normal, PROXY_SUMMARY);
        data.icons.push(Icon::stock(PROXY_ICON));
    });
    app
}

#[async_trait]
impl Plugin for GenericUpdatesPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![
            PluginRule::run_after(super::appstream::NAME),
            PluginRule::run_before(super::icons::NAME),
        ]
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::UPDATE_DETAILS) {
            return Ok(());
        }

        let updates: Vec<Arc<App>> = list.iter().filter(|a| is_os_update(a)).cloned().collect();
        if updates.is_empty() {
            return Ok(());
        }
        debug!("folding {} package updates into the OS update proxy", updates.len());

        let proxy = os_update_proxy(ctx);
        let urgency = updates
            .iter()
            .map(|a| a.read().update_urgency)
            .max()
            .unwrap_or_default();
        proxy.update(|data| {
            data.update_urgency = urgency;
            for app in &updates {
                data.add_related(app.clone());
            }
        });
        for app in &updates {
            list.remove(app);
        }
        list.add(proxy.shared());
        Ok(())
    }
}
