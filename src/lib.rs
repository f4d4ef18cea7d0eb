// src/lib.rs

//! AppCenter engine
//!
//! Plugin orchestration and app-list refinement for a desktop software
//! center. Independent plugins contribute apps to shared lists and enrich
//! them in a deterministic order derived from their declared rules.
//!
//! # Architecture
//!
//! - Apps: shared, lock-protected records merged by identity in [`AppList`]
//! - Plugins: capability-declaring trait objects ordered by run-before/after rules
//! - Refine: ordered plugin passes that fill only the data a caller asked for
//! - Loader: setup, listing, refresh and shutdown over the resolved plugin order

pub mod app;
mod bitset;
pub mod config;
pub mod engine;
mod error;
pub mod icon;
pub mod os_release;
pub mod plugin;
pub mod plugins;
pub mod query;
pub mod settings;

pub use app::{App, AppData, AppKind, AppList, AppState, Category, DedupFlags, Quality, Quirks};
pub use config::Config;
pub use engine::{PluginLoader, RefineReport, RefinementEngine};
pub use error::{Error, ErrorCategory, Result};
pub use icon::{IconRequest, IconResolver, Pixbuf};
pub use os_release::OsRelease;
pub use plugin::{
    Capabilities, Plugin, PluginContext, PluginEvent, PluginRegistry, PluginRule, RefineFlags,
    RefineJobFlags, RefreshFlags, SharedContext,
};
pub use plugins::history::HistoryProvider;
pub use query::{AppQuery, QueryFilters};
pub use settings::Settings;
