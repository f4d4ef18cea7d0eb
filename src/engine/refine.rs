// src/engine/refine.rs

//! The refine pipeline
//!
//! Refining runs every enabled plugin implementing `refine` against one
//! shared [`AppList`], strictly one plugin at a time in resolved order. A
//! plugin may fan out internally, but it has finished all its work by the
//! time it returns, so the next plugin always sees a settled list.
//!
//! After the main pass, runtimes and related apps are refined one layer
//! deep with the corresponding flag removed.

use crate::app::AppList;
use crate::error::{Error, Result};
use crate::plugin::helpers::cancellable;
use crate::plugin::event::EventLog;
use crate::plugin::{
    Capabilities, PluginEvent, PluginRegistry, RefineFlags, RefineJobFlags, SharedContext,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Time spent in one plugin during a refine
#[derive(Debug, Clone, Serialize)]
pub struct PluginRun {
    pub plugin: String,
    pub duration: Duration,
}

/// What a refine call did
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefineReport {
    /// Plugin invocations in the order they ran, including nested passes
    pub runs: Vec<PluginRun>,
    /// Non-fatal failures recorded while refining
    pub events: Vec<PluginEvent>,
    /// Unresolved wildcards dropped because of `FILTER_WILDCARDS`
    pub wildcards_removed: usize,
}

impl RefineReport {
    /// Names of the plugins that ran, in order
    pub fn plugins_run(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.plugin.as_str()).collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.runs.iter().map(|r| r.duration).sum()
    }
}

pub struct RefinementEngine<'a> {
    registry: &'a PluginRegistry,
    shared: &'a Arc<SharedContext>,
}

impl<'a> RefinementEngine<'a> {
    pub fn new(registry: &'a PluginRegistry, shared: &'a Arc<SharedContext>) -> Self {
        Self { registry, shared }
    }

    /// Refine `list` in place
    ///
    /// Apps are never removed unless `FILTER_WILDCARDS` is set, in which
    /// case wildcards nobody resolved are dropped, even when no plugin ran. On error, changes made by
    /// plugins that already ran are kept.
    pub async fn run(
        &self,
        list: &mut AppList,
        flags: RefineFlags,
        job_flags: RefineJobFlags,
        cancel: &CancellationToken,
    ) -> Result<RefineReport> {
        let mut report = RefineReport::default();
        let flags = flags.with_implied();
        let events = EventLog::new();
        let started = Instant::now();

        if flags.is_empty() || list.is_empty() {
            debug!("nothing to refine ({} apps, {:?})", list.len(), flags);
        } else {
            self.refine_passes(list, flags, job_flags, cancel, &events, &mut report)
                .await?;
        }

        if job_flags.contains(RefineJobFlags::FILTER_WILDCARDS) {
            let before = list.len();
            list.retain(|app| !app.is_wildcard());
            report.wildcards_removed = before - list.len();
        }
        report.events = events.snapshot();

        info!(
            "refined {} apps with {} plugin runs in {:?}",
            list.len(),
            report.runs.len(),
            started.elapsed()
        );
        Ok(report)
    }

    /// The main pass, then runtimes and related apps one layer deep
    async fn refine_passes(
        &self,
        list: &mut AppList,
        flags: RefineFlags,
        job_flags: RefineJobFlags,
        cancel: &CancellationToken,
        events: &EventLog,
        report: &mut RefineReport,
    ) -> Result<()> {
        self.refine_layer(list, flags, job_flags, cancel, events, report).await?;

        if flags.contains(RefineFlags::RUNTIME) {
            let mut runtimes = AppList::new();
            for app in list.iter() {
                let runtime = app.read().runtime.clone();
                if let Some(runtime) = runtime {
                    runtimes.add(runtime);
                }
            }
            let runtime_flags = flags - RefineFlags::RUNTIME;
            if !runtimes.is_empty() && !runtime_flags.is_empty() {
                debug!("refining {} runtimes", runtimes.len());
                self.refine_layer(&mut runtimes, runtime_flags, job_flags, cancel, events, report)
                    .await?;
            }
        }

        if flags.contains(RefineFlags::RELATED) {
            let mut related = AppList::new();
            for app in list.iter() {
                related.add_list(&app.related());
            }
            let related_flags = flags - RefineFlags::RELATED;
            if !related.is_empty() && !related_flags.is_empty() {
                debug!("refining {} related apps", related.len());
                self.refine_layer(&mut related, related_flags, job_flags, cancel, events, report)
                    .await?;
            }
        }
        Ok(())
    }

    async fn refine_layer(
        &self,
        list: &mut AppList,
        flags: RefineFlags,
        job_flags: RefineJobFlags,
        cancel: &CancellationToken,
        events: &EventLog,
        report: &mut RefineReport,
    ) -> Result<()> {
        for entry in self.registry.plugins_implementing(Capabilities::REFINE) {
            let ctx = entry.context(self.shared, cancel).with_job_events(events.clone());
            ctx.check_cancelled()?;

            let started = Instant::now();
            let result = cancellable(&ctx, entry.plugin().refine(&ctx, list, flags, job_flags)).await;
            let duration = started.elapsed();

            match result {
                Ok(()) => {}
                Err(e) if e.is_unsupported() => {
                    debug!("{} skipped refine: {}", entry.name(), e);
                    continue;
                }
                Err(e) if e.is_cancelled() => {
                    debug!("refine cancelled in {}", entry.name());
                    return Err(e);
                }
                Err(e) => return Err(Error::plugin(entry.name(), e)),
            }

            debug!("{} refined {} apps in {:?}", entry.name(), list.len(), duration);
            report.runs.push(PluginRun {
                plugin: entry.name().to_string(),
                duration,
            });
        }
        Ok(())
    }
}
