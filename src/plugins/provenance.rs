// src/plugins/provenance.rs

//! Mark apps coming from official repositories
//!
//! An app gets [`Quirks::PROVENANCE`] when its origin, or failing that the
//! repository part of its default source id, matches one of the globs in
//! the `official-repos` setting.

use super::{compile_globs, matches_any, WatchedSetting};
use crate::app::{AppData, AppList, Quirks};
use crate::error::Result;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use crate::settings::{Settings, OFFICIAL_REPOS};
use async_trait::async_trait;
use glob::Pattern;

pub const NAME: &str = "provenance";

pub struct ProvenancePlugin {
    repos: WatchedSetting<Vec<Pattern>>,
}

fn official_repos(settings: &Settings) -> Vec<Pattern> {
    compile_globs(&settings.get_strv(OFFICIAL_REPOS))
}

impl ProvenancePlugin {
    pub fn new() -> Self {
        Self {
            repos: WatchedSetting::new(&[OFFICIAL_REPOS], official_repos),
        }
    }
}

impl Default for ProvenancePlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Repository named in a package source id such as `bash;5.2;x86_64;installed:fedora`
fn source_id_repo(source_id: &str) -> Option<&str> {
    let (_, repo) = source_id.rsplit_once(';')?;
    Some(repo.strip_prefix("installed:").unwrap_or(repo))
}

fn is_official(data: &AppData, repos: &[Pattern]) -> bool {
    if data.origin.as_deref().is_some_and(|origin| matches_any(repos, origin)) {
        return true;
    }
    data.source_id_default()
        .and_then(source_id_repo)
        .is_some_and(|repo| matches_any(repos, repo))
}

#[async_trait]
impl Plugin for ProvenancePlugin {
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
        if !flags.contains(RefineFlags::PROVENANCE) {
            return Ok(());
        }
        let repos = self.repos.get(ctx.settings());
        if repos.is_empty() {
            return Ok(());
        }

        for app in list.iter() {
            app.update(|data| {
                if !data.has_quirk(Quirks::PROVENANCE) && is_official(data, &repos) {
                    data.add_quirk(Quirks::PROVENANCE);
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
    use crate::plugin::SharedContext;
    use std::sync::Arc;

    fn context(repos: &[&str]) -> PluginContext {
        let shared = SharedContext::default();
        shared
            .settings
            .set_strv(OFFICIAL_REPOS, repos.iter().map(|s| s.to_string()).collect());
        PluginContext::new(
            NAME,
            0,
            Default::default(),
            Arc::new(shared),
            Default::default(),
        )
    }

    #[test]
    fn test_source_id_repo() {
        assert_eq!(source_id_repo("bash;5.2;x86_64;installed:fedora"), Some("fedora"));
        assert_eq!(source_id_repo("bash;5.2;x86_64;updates"), Some("updates"));
        assert_eq!(source_id_repo("bash"), None);
    }

    #[tokio::test]
    async fn test_origin_and_source_id_matching() {
        let ctx = context(&["fedora*", "updates"]);
        let by_origin = App::new("a").shared();
        by_origin.update(|d| d.origin = Some("fedora-cisco".into()));
        let by_source = App::new("b").shared();
        by_source.update(|d| d.add_source_id("bash;5.2;x86_64;installed:updates"));
        let third_party = App::new("c").shared();
        third_party.update(|d| d.origin = Some("rpmfusion".into()));

        let mut list = AppList::new();
        list.add(by_origin.clone());
        list.add(by_source.clone());
        list.add(third_party.clone());

        let plugin = ProvenancePlugin::new();
        plugin
            .refine(&ctx, &mut list, RefineFlags::PROVENANCE, RefineJobFlags::NONE)
            .await
            .unwrap();

        assert!(by_origin.has_quirk(Quirks::PROVENANCE));
        assert!(by_source.has_quirk(Quirks::PROVENANCE));
        assert!(!third_party.has_quirk(Quirks::PROVENANCE));
    }

    #[tokio::test]
    async fn test_settings_change_is_picked_up() {
        let ctx = context(&["fedora"]);
        let app = App::new("a").shared();
        app.update(|d| d.origin = Some("rpmfusion".into()));
        let mut list = AppList::new();
        list.add(app.clone());

        let plugin = ProvenancePlugin::new();
        plugin.setup(&ctx).await.unwrap();
        plugin
            .refine(&ctx, &mut list, RefineFlags::PROVENANCE, RefineJobFlags::NONE)
            .await
            .unwrap();
        assert!(!app.has_quirk(Quirks::PROVENANCE));

        ctx.settings()
            .set_strv(OFFICIAL_REPOS, vec!["fedora".into(), "rpmfusion".into()]);
        plugin
            .refine(&ctx, &mut list, RefineFlags::PROVENANCE, RefineJobFlags::NONE)
            .await
            .unwrap();
        assert!(app.has_quirk(Quirks::PROVENANCE));
    }
}
