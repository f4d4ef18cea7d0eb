// src/plugins/os_release.rs

//! The running operating system as an app
//!
//! Setup builds one app from the parsed os-release data. Refine swaps it in
//! for any `system` wildcard, so callers can ask for the OS by that id.

use crate::app::{ids, keys, App, AppKind, AppList, AppState, Quality, UrlKind};
use crate::error::{Error, Result};
use crate::os_release::OsRelease;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const NAME: &str = "os-release";

#[derive(Debug, Default)]
pub struct OsReleasePlugin {
    system: RwLock<Option<Arc<App>>>,
}

impl OsReleasePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// The system app, once setup has run
    pub fn system_app(&self) -> Option<Arc<App>> {
        self.system.read().clone()
    }
}

/// Reverse-DNS id built from the homepage host, e.g. `org.fedoraproject.Fedora-39`
fn system_app_id(release: &OsRelease) -> Option<String> {
    let home = Url::parse(release.home_url.as_deref()?).ok()?;
    let host = home.host_str()?;
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return None;
    }
    Some(format!(
        "{}.{}.{}-{}",
        parts[1],
        parts[0],
        release.name.as_deref()?,
        release.version_id.as_deref()?
    ))
}

fn build_system_app(ctx: &PluginContext, release: &OsRelease) -> App {
    let app = ctx.new_app(Some(ids::SYSTEM));
    app.update(|data| {
        data.kind = AppKind::OperatingSystem;
        data.set_state(AppState::Installed);
        if let Some(cpe) = &release.cpe_name {
            data.set_metadata(keys::CPE_NAME, cpe.as_str());
        }
        if let Some(name) = &release.name {
            data.set_name(Quality::Lowest, name.as_str());
        }
        if let Some(version) = &release.version_id {
            data.version = Some(version.clone());
        }
        if let Some(home) = &release.home_url {
            data.set_url(UrlKind::Homepage, home.as_str());
        }
        if let Some(id) = system_app_id(release) {
            data.set_id(id);
        }
    });
    app
}

#[async_trait]
impl Plugin for OsReleasePlugin {
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
        let release = ctx
            .os_release()
            .ok_or_else(|| Error::NotFound("os-release data not available".to_string()))?;
        let app = build_system_app(ctx, release);
        debug!("system app is {}", app.unique_id());
        *self.system.write() = Some(app.shared());
        Ok(())
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        let Some(system) = self.system_app() else {
            return Ok(());
        };
        let wildcards: Vec<Arc<App>> = list
            .wildcards()
            .into_iter()
            .filter(|w| w.has_id(ids::SYSTEM))
            .collect();
        for wildcard in wildcards {
            let install_date = wildcard.read().install_date;
            system.update(|data| {
                if data.install_date.is_none() {
                    data.install_date = install_date;
                }
            });
            list.replace_wildcard(&wildcard, system.clone());
        }
        Ok(())
    }
}
