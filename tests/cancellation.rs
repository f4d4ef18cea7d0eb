// tests/cancellation.rs

//! Cancellation: a cancelled call returns promptly and records nothing.

mod common;

use appcenter::plugin::PluginRule;
use appcenter::{Error, RefineFlags, RefineJobFlags};
use common::{loader_with, trace, wildcards, CatalogPlugin, StuckPlugin, TracePlugin};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_cancel_interrupts_a_stuck_plugin() {
    let trace = trace();
    let loader = loader_with(vec![
        Arc::new(StuckPlugin),
        TracePlugin::new("after", vec![PluginRule::run_after("stuck")], &trace),
    ])
    .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut list = wildcards(&["org.example.App"]);
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        loader.refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &cancel),
    )
    .await
    .expect("refine did not stop after cancellation");

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(trace.lock().is_empty());
    assert!(loader.events().is_empty());
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let trace = trace();
    let loader = loader_with(vec![
        CatalogPlugin::new("catalog", vec![("org.gnome.Maps", "Maps")]),
        TracePlugin::new("tracer", vec![], &trace),
    ])
    .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut list = wildcards(&["org.example.App"]);
    let err = loader
        .refine(&mut list, RefineFlags::ICON, RefineJobFlags::NONE, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(trace.lock().is_empty());

    let err = loader
        .search(&["maps".to_string()], RefineFlags::NONE, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
