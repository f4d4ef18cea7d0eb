// tests/ordering.rs

//! Plugin selection and ordering through the loader: rules, cycles,
//! conflicts, name filters and setup failures.

mod common;

use appcenter::app::AppList;
use appcenter::plugin::{Capabilities, Plugin, PluginContext, PluginRegistry, PluginRule};
use appcenter::{App, Config, Error, ErrorCategory, PluginLoader, RefineFlags, RefineJobFlags, Result};
use appcenter::SharedContext;
use async_trait::async_trait;
use common::{loader_with, trace, TracePlugin};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn one_app() -> AppList {
    let mut list = AppList::new();
    list.add(App::new("org.example.App").shared());
    list
}

#[tokio::test]
async fn test_rules_decide_run_order() {
    let trace = trace();
    let loader = loader_with(vec![
        TracePlugin::new("late", vec![PluginRule::run_after("early")], &trace),
        TracePlugin::new("early", vec![], &trace),
        TracePlugin::new(
            "middle",
            vec![PluginRule::run_after("early"), PluginRule::run_before("late")],
            &trace,
        ),
    ])
    .await;

    let mut list = one_app();
    let report = loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(*trace.lock(), vec!["early", "middle", "late"]);
    assert_eq!(report.plugins_run(), vec!["early", "middle", "late"]);
}

#[tokio::test]
async fn test_order_is_stable_across_calls() {
    let trace = trace();
    let loader = loader_with(vec![
        TracePlugin::new("b", vec![], &trace),
        TracePlugin::new("a", vec![PluginRule::run_before("b")], &trace),
        TracePlugin::new("c", vec![], &trace),
    ])
    .await;

    let cancel = CancellationToken::new();
    for _ in 0..3 {
        let mut list = one_app();
        loader
            .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &cancel)
            .await
            .unwrap();
    }
    let runs = trace.lock().clone();
    assert_eq!(runs.len(), 9);
    assert!(runs.chunks(3).all(|run| run == &runs[..3]));
    let pos = |name: &str| runs.iter().position(|n| n == name).unwrap();
    assert!(pos("a") < pos("b"));
}

#[tokio::test]
async fn test_rules_naming_absent_plugins_are_ignored() {
    let trace = trace();
    let loader = loader_with(vec![
        TracePlugin::new("only", vec![PluginRule::run_after("nowhere")], &trace),
    ])
    .await;

    let mut list = one_app();
    loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(*trace.lock(), vec!["only"]);
}

#[tokio::test]
async fn test_cycle_fails_setup() {
    let trace = trace();
    let mut registry = PluginRegistry::new();
    registry
        .register(TracePlugin::new("a", vec![PluginRule::run_before("b")], &trace))
        .unwrap();
    registry
        .register(TracePlugin::new("b", vec![PluginRule::run_before("a")], &trace))
        .unwrap();

    let mut loader = PluginLoader::with_registry(registry, SharedContext::default());
    let err = loader.setup(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("cycle"));

    // Nothing may run on a loader that was never set up
    let mut list = one_app();
    let err = loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(trace.lock().is_empty());
}

#[tokio::test]
async fn test_conflicts_keep_the_earlier_plugin() {
    let trace = trace();
    let loader = loader_with(vec![
        TracePlugin::new("first", vec![PluginRule::conflicts("second")], &trace),
        TracePlugin::new("second", vec![PluginRule::conflicts("first")], &trace),
    ])
    .await;

    let state = loader.plugin_state();
    let second = state.iter().find(|s| s.name == "second").unwrap();
    assert!(!second.enabled);
    assert_eq!(second.disabled_reason.as_deref(), Some("conflicts with first"));
    assert!(state.iter().find(|s| s.name == "first").unwrap().enabled);
}

#[tokio::test]
async fn test_config_blocklist_disables_plugin() {
    let trace = trace();
    let mut registry = PluginRegistry::new();
    registry.register(TracePlugin::new("wanted", vec![], &trace)).unwrap();
    registry.register(TracePlugin::new("unwanted", vec![], &trace)).unwrap();

    let config: Config = toml::from_str("[plugins]\nblocklist = [\"unwanted\"]\n").unwrap();
    let shared = SharedContext {
        config: Arc::new(config),
        ..SharedContext::default()
    };
    let mut loader = PluginLoader::with_registry(registry, shared);
    loader.setup(&CancellationToken::new()).await.unwrap();

    let mut list = one_app();
    loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(*trace.lock(), vec!["wanted"]);
}

struct BrokenSetup;

#[async_trait]
impl Plugin for BrokenSetup {
    fn name(&self) -> &str {
        "broken-setup"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SETUP | Capabilities::REFINE
    }

    async fn setup(&self, _ctx: &PluginContext) -> Result<()> {
        Err(Error::NotFound("helper binary".to_string()))
    }

    async fn refine(
        &self,
        _ctx: &PluginContext,
        _list: &mut AppList,
        _flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        panic!("disabled plugin must not refine");
    }
}

#[tokio::test]
async fn test_setup_failure_disables_only_that_plugin() {
    let trace = trace();
    let loader = loader_with(vec![
        Arc::new(BrokenSetup),
        TracePlugin::new("healthy", vec![PluginRule::run_after("broken-setup")], &trace),
    ])
    .await;

    let state = loader.plugin_state();
    let broken = state.iter().find(|s| s.name == "broken-setup").unwrap();
    assert!(!broken.enabled);
    assert!(broken.disabled_reason.as_deref().unwrap().starts_with("setup failed"));

    let mut list = one_app();
    loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(*trace.lock(), vec!["healthy"]);
}
