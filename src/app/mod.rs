// src/app/mod.rs
//! Software items and the lists that hold them
//!
//! An [`App`] is one software item: a desktop application, a package, a
//! repository, an OS update meta-group or the OS itself. Apps are created by
//! whichever plugin first discovers them and are then enriched by every
//! refine pass. They are shared by reference (`Arc<App>`) between lists and
//! plugin caches, so all mutation goes through an internal lock.
//!
//! # Identity
//!
//! The `id` may be unknown when an app is created. Once assigned it never
//! changes. Wildcard apps (see [`Quirks::IS_WILDCARD`]) are placeholders
//! whose id is matched against concrete results by [`AppList`].
//!
//! # Atomic updates
//!
//! Plugins that compute several fields for an app should apply them in one
//! [`App::update`] call so that no reader observes a half-refined app.

pub mod category;
pub mod list;
pub mod quirks;
pub mod state;

pub use category::Category;
pub use list::{AppList, DedupFlags};
pub use quirks::Quirks;
pub use state::AppState;

use crate::icon::Pixbuf;
use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Well-known metadata keys, namespaced as `Namespace::Key`
pub mod keys {
    /// Name of the plugin that created the app
    pub const CREATOR: &str = "GnomeSoftware::Creator";
    pub const APP_TILE_CSS: &str = "GnomeSoftware::AppTile-css";
    pub const FEATURE_TILE_CSS: &str = "GnomeSoftware::FeatureTile-css";
    pub const UPGRADE_BANNER_CSS: &str = "GnomeSoftware::UpgradeBanner-css";
    pub const CPE_NAME: &str = "GnomeSoftware::CpeName";

    /// Keys holding CSS that may reference `@keycolor-NN@` placeholders
    pub const CSS_KEYS: [&str; 3] = [APP_TILE_CSS, FEATURE_TILE_CSS, UPGRADE_BANNER_CSS];
}

/// Well-known app ids
pub mod ids {
    /// Synthetic proxy grouping generic OS package updates
    pub const OS_UPDATE: &str = "org.gnome.Software.OsUpdate";
    /// Wildcard placeholder for the running operating system
    pub const SYSTEM: &str = "system";
}

// ============================================================================
// Classification enums
// ============================================================================

/// What kind of software item an app is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppKind {
    #[default]
    Unknown,
    DesktopApp,
    ConsoleApp,
    WebApp,
    Runtime,
    Addon,
    Font,
    Codec,
    InputMethod,
    Firmware,
    Driver,
    Localization,
    Generic,
    Package,
    Repository,
    Service,
    OperatingSystem,
    OsUpdate,
    OsUpgrade,
}

/// Packaging technology backing an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleKind {
    #[default]
    Unknown,
    Package,
    Flatpak,
    Snap,
    AppImage,
}

/// Installation scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppScope {
    #[default]
    Unknown,
    System,
    User,
}

/// How trustworthy a descriptive field value is
///
/// A write only replaces a stored value of equal or lower quality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Quality {
    #[default]
    Unknown,
    Lowest,
    Normal,
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlKind {
    Homepage,
    Bugtracker,
    Faq,
    Help,
    Donation,
    Translate,
    Missing,
}

/// Urgency of a pending update, ordered from least to most urgent
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateUrgency {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl AppKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AppKind::Unknown => "unknown",
            AppKind::DesktopApp => "desktop-app",
            AppKind::ConsoleApp => "console-app",
            AppKind::WebApp => "web-app",
            AppKind::Runtime => "runtime",
            AppKind::Addon => "addon",
            AppKind::Font => "font",
            AppKind::Codec => "codec",
            AppKind::InputMethod => "input-method",
            AppKind::Firmware => "firmware",
            AppKind::Driver => "driver",
            AppKind::Localization => "localization",
            AppKind::Generic => "generic",
            AppKind::Package => "package",
            AppKind::Repository => "repository",
            AppKind::Service => "service",
            AppKind::OperatingSystem => "operating-system",
            AppKind::OsUpdate => "os-update",
            AppKind::OsUpgrade => "os-upgrade",
        }
    }
}

impl BundleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BundleKind::Unknown => "unknown",
            BundleKind::Package => "package",
            BundleKind::Flatpak => "flatpak",
            BundleKind::Snap => "snap",
            BundleKind::AppImage => "appimage",
        }
    }
}

impl AppScope {
    pub fn as_str(self) -> &'static str {
        match self {
            AppScope::Unknown => "unknown",
            AppScope::System => "system",
            AppScope::User => "user",
        }
    }
}

// ============================================================================
// Attribute value types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    /// Themed icon looked up by name
    Stock,
    /// Pre-rendered icon in a local cache directory
    Cached,
    /// Arbitrary local file
    Local,
    /// Icon that must be downloaded
    Remote,
}

/// A reference to an icon, resolved to pixels by an `IconResolver`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Icon {
    pub kind: IconKind,
    /// Theme name, file path or URL depending on `kind`
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default = "default_icon_scale")]
    pub scale: u32,
}

fn default_icon_scale() -> u32 {
    1
}

impl Icon {
    pub fn stock(name: impl Into<String>) -> Self {
        Self {
            kind: IconKind::Stock,
            name: name.into(),
            width: 0,
            scale: 1,
        }
    }
}

/// A dominant color of an app's icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl KeyColor {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// CSS `rgb()` form
    pub fn to_css(&self) -> String {
        format!("rgb({},{},{})", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryAction {
    Install,
    Update,
    Remove,
}

/// A past install, update or removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub version: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvideKind {
    Id,
    Modalias,
    Mimetype,
    Binary,
    Font,
}

/// A capability provided by an app, such as a modalias it supports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provide {
    pub kind: ProvideKind,
    pub value: String,
}

/// Value stored under a metadata key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Variant(serde_json::Value),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            MetadataValue::Variant(serde_json::Value::String(s)) => Some(s),
            MetadataValue::Variant(_) => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        MetadataValue::Variant(value)
    }
}

/// A field value tagged with the quality of its source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranked<T> {
    value: Option<T>,
    quality: Quality,
}

impl<T: PartialEq> Ranked<T> {
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Store `value` unless a higher quality value is already present
    ///
    /// Returns true if the stored value changed.
    pub fn set(&mut self, quality: Quality, value: T) -> bool {
        if quality < self.quality {
            return false;
        }
        self.quality = quality;
        if self.value.as_ref() == Some(&value) {
            return false;
        }
        self.value = Some(value);
        true
    }
}

impl<T: Clone + PartialEq> Ranked<T> {
    /// Fill this field from `other` if it has no value yet
    fn fill_from(&mut self, other: &Ranked<T>) {
        if self.value.is_none() && other.value.is_some() {
            self.value = other.value.clone();
            self.quality = other.quality;
        }
    }
}

// ============================================================================
// AppData
// ============================================================================

/// The attributes of an app, guarded by the lock inside [`App`]
///
/// Plain descriptive fields are public. Fields with invariants (identity,
/// state, quirks, quality-ranked text, metadata and relations) go through
/// methods.
#[derive(Debug, Clone, Default)]
pub struct AppData {
    id: Option<String>,
    state: AppState,
    quirks: Quirks,
    name: Ranked<String>,
    summary: Ranked<String>,
    description: Ranked<String>,
    license: Ranked<String>,
    metadata: BTreeMap<String, MetadataValue>,
    related: AppList,

    pub kind: AppKind,
    pub bundle_kind: BundleKind,
    pub scope: AppScope,
    pub branch: Option<String>,
    pub version: Option<String>,
    pub update_version: Option<String>,
    pub update_details: Option<String>,
    pub update_urgency: UpdateUrgency,
    pub origin: Option<String>,
    pub origin_hostname: Option<String>,
    pub origin_ui: Option<String>,
    pub urls: BTreeMap<UrlKind, String>,
    pub icons: Vec<Icon>,
    pub key_colors: Vec<KeyColor>,
    pub screenshots: Vec<String>,
    pub pixbuf: Option<Arc<Pixbuf>>,
    pub categories: Vec<String>,
    pub menu_path: Option<Vec<String>>,
    pub history: Vec<HistoryEntry>,
    pub provides: Vec<Provide>,
    pub sources: Vec<String>,
    pub source_ids: Vec<String>,
    pub size_installed: Option<u64>,
    pub size_download: Option<u64>,
    pub install_date: Option<DateTime<Utc>>,
    /// Priority of the plugin that created the app
    pub priority: i32,
    pub management_plugin: Option<String>,
    pub local_file: Option<PathBuf>,
    pub runtime: Option<Arc<App>>,
}

impl AppData {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The id without any `prefix:` qualifier
    pub fn id_no_prefix(&self) -> Option<&str> {
        self.id.as_deref().map(strip_id_prefix)
    }

    /// Assign the id if none is set yet
    ///
    /// Returns false (and leaves the id alone) if a different id is already
    /// assigned.
    pub fn set_id(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        match &self.id {
            None => {
                self.id = Some(id);
                true
            }
            Some(existing) if *existing == id => false,
            Some(existing) => {
                warn!("refusing to change app id from {} to {}", existing, id);
                false
            }
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Move to a new state if the transition is legal
    pub fn set_state(&mut self, state: AppState) -> bool {
        if self.state == state {
            return false;
        }
        if !self.state.can_transition_to(state) {
            warn!(
                "ignoring invalid state change on {}: {} -> {}",
                self.id().unwrap_or("<unnamed>"),
                self.state,
                state
            );
            return false;
        }
        self.state = state;
        true
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn has_quirk(&self, quirk: Quirks) -> bool {
        self.quirks.contains(quirk)
    }

    pub fn add_quirk(&mut self, quirk: Quirks) {
        self.quirks.insert(quirk);
    }

    pub fn remove_quirk(&mut self, quirk: Quirks) {
        self.quirks.remove(quirk);
    }

    pub fn is_wildcard(&self) -> bool {
        self.quirks.contains(Quirks::IS_WILDCARD)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn set_name(&mut self, quality: Quality, name: impl Into<String>) -> bool {
        self.name.set(quality, name.into())
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.get().map(String::as_str)
    }

    pub fn set_summary(&mut self, quality: Quality, summary: impl Into<String>) -> bool {
        self.summary.set(quality, summary.into())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.get().map(String::as_str)
    }

    pub fn set_description(&mut self, quality: Quality, description: impl Into<String>) -> bool {
        self.description.set(quality, description.into())
    }

    pub fn license(&self) -> Option<&str> {
        self.license.get().map(String::as_str)
    }

    pub fn license_quality(&self) -> Quality {
        self.license.quality()
    }

    pub fn set_license(&mut self, quality: Quality, license: impl Into<String>) -> bool {
        self.license.set(quality, license.into())
    }

    pub fn metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetadataValue::as_str)
    }

    pub fn metadata_keys(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }

    /// Set a metadata value, replacing any different value wholesale
    ///
    /// Setting the value already stored is a no-op. Returns true if the map
    /// changed.
    pub fn set_metadata(&mut self, key: &str, value: impl Into<MetadataValue>) -> bool {
        let value = value.into();
        if self.metadata.get(key) == Some(&value) {
            return false;
        }
        if let Some(old) = self.metadata.insert(key.to_string(), value) {
            debug!("replacing metadata {} (was {:?})", key, old);
        }
        true
    }

    pub fn remove_metadata(&mut self, key: &str) -> bool {
        self.metadata.remove(key).is_some()
    }

    pub fn related(&self) -> &AppList {
        &self.related
    }

    pub fn add_related(&mut self, app: Arc<App>) {
        self.related.add(app);
    }

    pub fn url(&self, kind: UrlKind) -> Option<&str> {
        self.urls.get(&kind).map(String::as_str)
    }

    pub fn set_url(&mut self, kind: UrlKind, url: impl Into<String>) {
        self.urls.insert(kind, url.into());
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c.eq_ignore_ascii_case(category))
    }

    pub fn source_default(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }

    pub fn source_id_default(&self) -> Option<&str> {
        self.source_ids.first().map(String::as_str)
    }

    pub fn add_source(&mut self, source: impl Into<String>) {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    pub fn add_source_id(&mut self, source_id: impl Into<String>) {
        let source_id = source_id.into();
        if !self.source_ids.contains(&source_id) {
            self.source_ids.push(source_id);
        }
    }

    /// Identity string of the form `scope/bundle/origin/kind/id/branch`
    ///
    /// Unknown parts are written as `*`.
    pub fn unique_id(&self) -> String {
        fn part(value: Option<&str>) -> &str {
            match value {
                Some(v) if !v.is_empty() => v,
                _ => "*",
            }
        }
        fn known<'a>(value: &'a str, unknown: bool) -> &'a str {
            if unknown { "*" } else { value }
        }

        format!(
            "{}/{}/{}/{}/{}/{}",
            known(self.scope.as_str(), self.scope == AppScope::Unknown),
            known(self.bundle_kind.as_str(), self.bundle_kind == BundleKind::Unknown),
            part(self.origin.as_deref()),
            known(self.kind.as_str(), self.kind == AppKind::Unknown),
            part(self.id.as_deref()),
            part(self.branch.as_deref()),
        )
    }

    /// Whether this wildcard's id pattern matches a concrete `id`
    ///
    /// A trailing `*` matches by prefix. With [`Quirks::MATCH_ANY_PREFIX`]
    /// the concrete id may carry a `prefix:` qualifier.
    pub fn wildcard_matches(&self, id: &str) -> bool {
        let Some(pattern) = self.id.as_deref() else {
            return false;
        };
        if pattern == id {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            if id.starts_with(prefix) {
                return true;
            }
        }
        self.has_quirk(Quirks::MATCH_ANY_PREFIX) && strip_id_prefix(id) == pattern
    }

    /// Take fields from `defaults` wherever this app has no value
    ///
    /// Used when a concrete app replaces a wildcard. Values already present
    /// here always win. Quirks are merged, except the wildcard marker.
    pub fn absorb_defaults(&mut self, defaults: &AppData) {
        if self.id.is_none() {
            self.id = defaults.id.clone();
        }
        self.name.fill_from(&defaults.name);
        self.summary.fill_from(&defaults.summary);
        self.description.fill_from(&defaults.description);
        self.license.fill_from(&defaults.license);

        let mut quirks = defaults.quirks;
        quirks.remove(Quirks::IS_WILDCARD | Quirks::MATCH_ANY_PREFIX);
        self.quirks.insert(quirks);

        for (key, value) in &defaults.metadata {
            self.metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (kind, url) in &defaults.urls {
            self.urls.entry(*kind).or_insert_with(|| url.clone());
        }

        fill_option(&mut self.version, &defaults.version);
        fill_option(&mut self.update_version, &defaults.update_version);
        fill_option(&mut self.update_details, &defaults.update_details);
        fill_option(&mut self.origin, &defaults.origin);
        fill_option(&mut self.origin_hostname, &defaults.origin_hostname);
        fill_option(&mut self.origin_ui, &defaults.origin_ui);
        fill_option(&mut self.branch, &defaults.branch);
        fill_option(&mut self.menu_path, &defaults.menu_path);
        fill_option(&mut self.size_installed, &defaults.size_installed);
        fill_option(&mut self.size_download, &defaults.size_download);
        fill_option(&mut self.install_date, &defaults.install_date);
        fill_option(&mut self.management_plugin, &defaults.management_plugin);
        fill_option(&mut self.pixbuf, &defaults.pixbuf);
        fill_option(&mut self.runtime, &defaults.runtime);

        fill_vec(&mut self.icons, &defaults.icons);
        fill_vec(&mut self.key_colors, &defaults.key_colors);
        fill_vec(&mut self.screenshots, &defaults.screenshots);
        fill_vec(&mut self.categories, &defaults.categories);
        fill_vec(&mut self.provides, &defaults.provides);
        fill_vec(&mut self.history, &defaults.history);

        if self.kind == AppKind::Unknown {
            self.kind = defaults.kind;
        }
        if self.update_urgency == UpdateUrgency::Unknown {
            self.update_urgency = defaults.update_urgency;
        }
        if self.related.is_empty() {
            self.related = defaults.related.clone();
        }
    }
}

fn fill_option<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

fn fill_vec<T: Clone>(target: &mut Vec<T>, source: &[T]) {
    if target.is_empty() {
        target.extend_from_slice(source);
    }
}

fn strip_id_prefix(id: &str) -> &str {
    match id.split_once(':') {
        Some((_, rest)) => rest,
        None => id,
    }
}

// ============================================================================
// App
// ============================================================================

/// A shared, internally locked software item
#[derive(Debug, Default)]
pub struct App {
    data: RwLock<AppData>,
}

impl App {
    /// Create an app with a known id
    pub fn new(id: impl Into<String>) -> Self {
        let data = AppData {
            id: Some(id.into()),
            ..AppData::default()
        };
        Self::from_data(data)
    }

    /// Create an app whose id is not known yet
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Create a wildcard placeholder for `id`
    pub fn wildcard(id: impl Into<String>) -> Self {
        let app = Self::new(id);
        app.add_quirk(Quirks::IS_WILDCARD);
        app
    }

    pub fn from_data(data: AppData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Wrap in an `Arc` for sharing between lists and caches
    pub fn shared(self) -> Arc<App> {
        Arc::new(self)
    }

    /// Read access to all attributes
    ///
    /// Do not hold the guard across an `.await`.
    pub fn read(&self) -> RwLockReadGuard<'_, AppData> {
        self.data.read()
    }

    /// Apply several changes atomically
    pub fn update<R>(&self, f: impl FnOnce(&mut AppData) -> R) -> R {
        let mut data = self.data.write();
        f(&mut data)
    }

    /// A detached copy of the current attributes
    pub fn snapshot(&self) -> AppData {
        self.data.read().clone()
    }

    pub fn id(&self) -> Option<String> {
        self.data.read().id.clone()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.data.read().id.as_deref() == Some(id)
    }

    pub fn kind(&self) -> AppKind {
        self.data.read().kind
    }

    pub fn state(&self) -> AppState {
        self.data.read().state
    }

    pub fn set_state(&self, state: AppState) -> bool {
        self.data.write().set_state(state)
    }

    pub fn quirks(&self) -> Quirks {
        self.data.read().quirks
    }

    pub fn has_quirk(&self, quirk: Quirks) -> bool {
        self.data.read().has_quirk(quirk)
    }

    pub fn add_quirk(&self, quirk: Quirks) {
        self.data.write().add_quirk(quirk);
    }

    pub fn remove_quirk(&self, quirk: Quirks) {
        self.data.write().remove_quirk(quirk);
    }

    pub fn is_wildcard(&self) -> bool {
        self.data.read().is_wildcard()
    }

    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        self.data.read().metadata(key).cloned()
    }

    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.data.read().metadata_str(key).map(str::to_string)
    }

    pub fn set_metadata(&self, key: &str, value: impl Into<MetadataValue>) -> bool {
        self.data.write().set_metadata(key, value)
    }

    pub fn related(&self) -> AppList {
        self.data.read().related.clone()
    }

    pub fn unique_id(&self) -> String {
        self.data.read().unique_id()
    }

    /// Serializable view for reports and CLI output
    pub fn summary(&self) -> AppSummary {
        AppSummary::from(&*self.data.read())
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.read();
        write!(f, "{} [{}]", data.unique_id(), data.state)?;
        if !data.quirks.is_empty() {
            write!(f, " {:?}", data.quirks)?;
        }
        Ok(())
    }
}

/// Serializable snapshot of the commonly displayed fields of an app
#[derive(Debug, Clone, Serialize)]
pub struct AppSummary {
    pub id: Option<String>,
    pub unique_id: String,
    pub kind: AppKind,
    pub state: AppState,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    pub origin: Option<String>,
    pub origin_hostname: Option<String>,
    pub update_urgency: UpdateUrgency,
    pub size_installed: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quirks: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_colors: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl From<&AppData> for AppSummary {
    fn from(data: &AppData) -> Self {
        Self {
            id: data.id.clone(),
            unique_id: data.unique_id(),
            kind: data.kind,
            state: data.state,
            name: data.name().map(str::to_string),
            summary: data.summary().map(str::to_string),
            version: data.version.clone(),
            license: data.license().map(str::to_string),
            origin: data.origin.clone(),
            origin_hostname: data.origin_hostname.clone(),
            update_urgency: data.update_urgency,
            size_installed: data.size_installed,
            quirks: data.quirks.names(),
            menu_path: data.menu_path.clone(),
            key_colors: data.key_colors.iter().map(KeyColor::to_css).collect(),
            metadata: data.metadata.clone(),
            related: data.related.iter().map(|app| app.unique_id()).collect(),
        }
    }
}
