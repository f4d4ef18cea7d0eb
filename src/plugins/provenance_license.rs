// src/plugins/provenance_license.rs

//! Give apps from free-software repositories a generic free license

use super::{compile_globs, matches_any, WatchedSetting};
use crate::app::{AppList, Quality, Quirks};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use crate::settings::{Settings, FREE_REPOS, FREE_REPOS_URL};
use async_trait::async_trait;
use glob::Pattern;

pub const NAME: &str = "provenance-license";

struct FreeRepos {
    patterns: Vec<Pattern>,
    license_id: String,
}

fn free_repos(settings: &Settings) -> FreeRepos {
    let license_id = match settings.get_string(FREE_REPOS_URL) {
        Some(url) if !url.is_empty() => format!("LicenseRef-free={}", url),
        _ => "LicenseRef-free".to_string(),
    };
    FreeRepos {
        patterns: compile_globs(&settings.get_strv(FREE_REPOS)),
        license_id,
    }
}

pub struct ProvenanceLicensePlugin {
    repos: WatchedSetting<FreeRepos>,
}

impl ProvenanceLicensePlugin {
    pub fn new() -> Self {
        Self {
            repos: WatchedSetting::new(&[FREE_REPOS, FREE_REPOS_URL], free_repos),
        }
    }
}

impl Default for ProvenanceLicensePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for ProvenanceLicensePlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP | Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::provenance::NAME)]
    }

    async fn setup(&self, ctx: &PluginContext) -> Result<()> {
        self.repos.get(ctx.settings());
        Ok(())
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::LICENSE) {
            return Ok(());
        }
        let repos = self.repos.get(ctx.settings());
        if repos.patterns.is_empty() {
            return Ok(());
        }

        for app in list.iter() {
            app.update(|data| {
                if !data.has_quirk(Quirks::PROVENANCE) {
                    return;
                }
                let free = data
                    .origin
                    .as_deref()
                    .is_some_and(|origin| matches_any(&repos.patterns, origin));
                if free {
                    data.set_license(Quality::Normal, repos.license_id.clone());
                }
            });
        }
        Ok(())
    }
}
