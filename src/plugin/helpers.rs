// src/plugin/helpers.rs
//! Concurrency, cancellation and subprocess helpers for plugins
//!
//! A plugin step may fan out into many concurrent sub-operations, but it
//! must not return before every one of them finished or failed. The
//! helpers here provide that join barrier, stop promptly when the context
//! is cancelled, and keep one app's failure from failing the batch.

use super::context::PluginContext;
use crate::app::App;
use crate::error::{Error, Result};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Run `fut` unless the context is cancelled first
pub async fn cancellable<T>(ctx: &PluginContext, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let cancel = ctx.cancel_token().clone();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Run `fut` with a deadline
///
/// Expiry yields [`Error::TimedOut`], which counts as a cancellation.
pub async fn with_timeout<T>(
    ctx: &PluginContext,
    duration: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    let deadline = async {
        match tokio::time::timeout(duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::TimedOut(duration)),
        }
    };
    cancellable(ctx, deadline).await
}

/// Run `work` for every app with bounded concurrency and wait for all
///
/// Each sub-operation should compute its result first and then apply it to
/// its app with a single [`App::update`], so an app is never observed half
/// refined. A failing sub-operation is recorded as a plugin event and the
/// rest continue. Returns the number of failed apps, or
/// [`Error::Cancelled`] if the context was cancelled.
pub async fn for_each_app<F, Fut>(ctx: &PluginContext, apps: Vec<Arc<App>>, work: F) -> Result<usize>
where
    F: Fn(Arc<App>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if apps.is_empty() {
        return Ok(0);
    }
    let total = apps.len();
    let limit = ctx.max_concurrency();
    debug!("{}: processing {} apps (max {} concurrent)", ctx.plugin_name(), total, limit);

    let results: Vec<(Arc<App>, Result<()>)> = stream::iter(apps)
        .map(|app| {
            let fut = work(app.clone());
            async move {
                let result = cancellable(ctx, fut).await;
                (app, result)
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    ctx.check_cancelled()?;

    let mut failed = 0;
    for (app, result) in results {
        if let Err(e) = result {
            failed += 1;
            ctx.record_failure(Some(&app), &e);
        }
    }
    if failed > 0 {
        debug!("{}: {} of {} apps failed", ctx.plugin_name(), failed, total);
    }
    Ok(failed)
}

/// Run an external program and return its standard output
///
/// The child is killed if the context is cancelled while it runs.
pub async fn run_command(ctx: &PluginContext, program: &str, args: &[&str]) -> Result<String> {
    ctx.check_cancelled()?;
    debug!("running {} {}", program, args.join(" "));

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = cancellable(ctx, async {
        command
            .output()
            .await
            .map_err(|e| Error::command(program, format!("failed to start: {}", e)))
    })
    .await?;

    if !output.status.success() {
        return Err(Error::command(program, format!("exited with {}", output.status)));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| Error::DataFormat(format!("{} produced invalid UTF-8: {}", program, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Quirks;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn apps(n: usize) -> Vec<Arc<App>> {
        (0..n).map(|i| App::new(format!("org.example.App{}", i)).shared()).collect()
    }

    #[tokio::test]
    async fn test_for_each_app_visits_all() {
        let ctx = PluginContext::detached("test");
        let list = apps(20);
        let failed = for_each_app(&ctx, list.clone(), |app| async move {
            tokio::task::yield_now().await;
            app.add_quirk(Quirks::PROVENANCE);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(failed, 0);
        assert!(list.iter().all(|a| a.has_quirk(Quirks::PROVENANCE)));
    }

    #[tokio::test]
    async fn test_per_app_failures_are_recorded() {
        let ctx = PluginContext::detached("test");
        let failed = for_each_app(&ctx, apps(4), |app| async move {
            if app.has_id("org.example.App2") {
                return Err(Error::Download("not found".into()));
            }
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(failed, 1);
        let events = ctx.events().snapshot();
        assert_eq!(events.len(), 1);
        assert!(events[0].app.as_deref().unwrap().contains("org.example.App2"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let ctx = PluginContext::detached("test");
        let limit = ctx.max_concurrency();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for_each_app(&ctx, apps(limit * 3), |_| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= limit);
    }

    #[tokio::test]
    async fn test_cancellation_stops_pending_work() {
        let ctx = PluginContext::detached("test");
        let token = ctx.cancel_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let started = std::time::Instant::now();
        let result = for_each_app(&ctx, apps(4), |_| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(ctx.events().is_empty());
    }

    #[tokio::test]
    async fn test_with_timeout() {
        let ctx = PluginContext::detached("test");
        let result: Result<()> = with_timeout(&ctx, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::TimedOut(_)));
        assert!(err.is_cancelled());

        let value = with_timeout(&ctx, Duration::from_secs(5), async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_command_missing_binary() {
        let ctx = PluginContext::detached("test");
        let err = run_command(&ctx, "/nonexistent/appcenter-test-binary", &[]).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert!(err.is_transient());
    }
}
