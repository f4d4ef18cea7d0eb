// src/app/list.rs
//! Ordered, identity-aware app collection
//!
//! Adding to an [`AppList`] deduplicates by id:
//!
//! - a concrete app whose id is already held by another concrete app is
//!   dropped (first writer wins, later plugins refine in place)
//! - a concrete app matching a wildcard placeholder takes the
//!   placeholder's list position, absorbing the placeholder's fields as
//!   low-priority defaults
//! - a wildcard matching a concrete app already in the list donates its
//!   fields to that app and is not inserted

use super::{App, AppData};
use crate::bitset::bitset;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

bitset! {
    /// Keys used by [`AppList::filter_duplicates`]
    pub struct DedupFlags: u32 {
        const KEY_ID = 1 << 0;
        const KEY_SOURCE = 1 << 1;
        const KEY_VERSION = 1 << 2;
        /// On a tie, keep the installed app
        const PREFER_INSTALLED = 1 << 3;
    }
}

/// What happened to an app passed to [`AppList::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended at the end
    Appended,
    /// Took the position of the wildcard at this index
    ReplacedWildcard(usize),
    /// A concrete app already present absorbed this wildcard
    MergedIntoExisting(usize),
    /// An app with the same identity is already present
    Duplicate,
}

impl AddOutcome {
    /// True if the list now holds the added app itself
    pub fn inserted(self) -> bool {
        matches!(self, AddOutcome::Appended | AddOutcome::ReplacedWildcard(_))
    }
}

/// An ordered list of shared apps
#[derive(Debug, Clone, Default)]
pub struct AppList {
    apps: Vec<Arc<App>>,
    size_peak: usize,
}

impl AppList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Largest length this list has reached
    pub fn size_peak(&self) -> usize {
        self.size_peak
    }

    pub fn get(&self, index: usize) -> Option<&Arc<App>> {
        self.apps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<App>> {
        self.apps.iter()
    }

    pub fn as_slice(&self) -> &[Arc<App>] {
        &self.apps
    }

    pub fn into_vec(self) -> Vec<Arc<App>> {
        self.apps
    }

    /// True if this exact app instance is in the list
    pub fn contains(&self, app: &Arc<App>) -> bool {
        self.apps.iter().any(|a| Arc::ptr_eq(a, app))
    }

    /// Merge-aware add, see the module docs for the rules
    pub fn add(&mut self, app: Arc<App>) -> AddOutcome {
        if self.contains(&app) {
            return AddOutcome::Duplicate;
        }

        let (id, is_wildcard) = {
            let data = app.read();
            (data.id().map(str::to_string), data.is_wildcard())
        };
        let Some(id) = id else {
            self.push(app);
            return AddOutcome::Appended;
        };

        let outcome = if is_wildcard {
            self.add_wildcard(app, &id)
        } else {
            self.add_concrete(app, &id)
        };
        debug!("app list add {}: {:?}", id, outcome);
        outcome
    }

    fn add_wildcard(&mut self, app: Arc<App>, id: &str) -> AddOutcome {
        let pattern = app.snapshot();
        for (index, existing) in self.apps.iter().enumerate() {
            let data = existing.read();
            if data.is_wildcard() {
                if data.id() == Some(id) {
                    return AddOutcome::Duplicate;
                }
                continue;
            }
            let matches = data.id().is_some_and(|existing_id| pattern.wildcard_matches(existing_id));
            drop(data);
            if matches {
                existing.update(|concrete| concrete.absorb_defaults(&pattern));
                return AddOutcome::MergedIntoExisting(index);
            }
        }
        self.push(app);
        AddOutcome::Appended
    }

    fn add_concrete(&mut self, app: Arc<App>, id: &str) -> AddOutcome {
        let mut wildcard_index = None;
        for (index, existing) in self.apps.iter().enumerate() {
            let data = existing.read();
            if data.is_wildcard() {
                if wildcard_index.is_none() && data.wildcard_matches(id) {
                    wildcard_index = Some(index);
                }
            } else if data.id() == Some(id) {
                return AddOutcome::Duplicate;
            }
        }

        match wildcard_index {
            Some(index) => {
                let defaults = self.apps[index].snapshot();
                app.update(|concrete| concrete.absorb_defaults(&defaults));
                self.apps[index] = app;
                AddOutcome::ReplacedWildcard(index)
            }
            None => {
                self.push(app);
                AddOutcome::Appended
            }
        }
    }

    /// Replace a specific wildcard with a concrete app of any id
    ///
    /// The concrete app absorbs the wildcard's fields as defaults. If the
    /// concrete app, or another concrete app with its id, is already in the
    /// list, that entry absorbs them instead and the wildcard is removed.
    pub fn replace_wildcard(&mut self, wildcard: &Arc<App>, concrete: Arc<App>) -> bool {
        let Some(index) = self.apps.iter().position(|a| Arc::ptr_eq(a, wildcard)) else {
            return false;
        };
        let defaults = wildcard.snapshot();
        let concrete_id = concrete.id();
        let existing = self.apps.iter().find(|a| {
            if Arc::ptr_eq(a, &concrete) {
                return true;
            }
            let data = a.read();
            !data.is_wildcard() && concrete_id.is_some() && data.id() == concrete_id.as_deref()
        });
        if let Some(existing) = existing {
            existing.update(|data| data.absorb_defaults(&defaults));
            self.apps.remove(index);
            return true;
        }
        concrete.update(|data| data.absorb_defaults(&defaults));
        self.apps[index] = concrete;
        true
    }

    /// Add every app of `other`, in order
    pub fn add_list(&mut self, other: &AppList) {
        for app in other.iter() {
            self.add(app.clone());
        }
    }

    fn push(&mut self, app: Arc<App>) {
        self.apps.push(app);
        self.size_peak = self.size_peak.max(self.apps.len());
    }

    /// Remove an app by instance, or the concrete app sharing its id
    pub fn remove(&mut self, app: &Arc<App>) -> bool {
        if let Some(index) = self.apps.iter().position(|a| Arc::ptr_eq(a, app)) {
            self.apps.remove(index);
            return true;
        }
        match app.id() {
            Some(id) => self.remove_by_id(&id),
            None => false,
        }
    }

    /// Remove the concrete app with this id
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let position = self.apps.iter().position(|a| {
            let data = a.read();
            !data.is_wildcard() && data.id() == Some(id)
        });
        match position {
            Some(index) => {
                self.apps.remove(index);
                true
            }
            None => false,
        }
    }

    /// Find an app by id
    ///
    /// Concrete apps are preferred. Failing that, the first wildcard whose
    /// pattern matches `id` is returned.
    pub fn lookup(&self, id: &str) -> Option<Arc<App>> {
        let mut wildcard = None;
        for app in &self.apps {
            let data = app.read();
            if data.is_wildcard() {
                if wildcard.is_none() && data.wildcard_matches(id) {
                    wildcard = Some(app.clone());
                }
            } else if data.id() == Some(id) {
                return Some(app.clone());
            }
        }
        wildcard
    }

    /// Keep only apps for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&Arc<App>) -> bool) {
        self.apps.retain(|app| keep(app));
    }

    /// Wildcards still present in the list
    pub fn wildcards(&self) -> Vec<Arc<App>> {
        self.apps.iter().filter(|a| a.is_wildcard()).cloned().collect()
    }

    pub fn truncate(&mut self, len: usize) {
        self.apps.truncate(len);
    }

    pub fn sort_by(&mut self, mut compare: impl FnMut(&AppData, &AppData) -> Ordering) {
        self.apps.sort_by(|a, b| {
            if Arc::ptr_eq(a, b) {
                return Ordering::Equal;
            }
            compare(&a.read(), &b.read())
        });
    }

    /// Collapse apps sharing the key selected by `flags`
    ///
    /// The app with the higher plugin priority survives. With
    /// `PREFER_INSTALLED`, an installed app wins a priority tie. The
    /// survivor keeps the position of the first app with that key. Apps
    /// without an id are never collapsed.
    pub fn filter_duplicates(&mut self, flags: DedupFlags) {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<Arc<App>> = Vec::with_capacity(self.apps.len());

        for app in self.apps.drain(..) {
            let key = dedup_key(&app.read(), flags);
            let Some(key) = key else {
                kept.push(app);
                continue;
            };
            match slots.get(&key) {
                Some(&slot) => {
                    if is_better(&app.read(), &kept[slot].read(), flags) {
                        debug!("preferring {} over {}", app.unique_id(), kept[slot].unique_id());
                        kept[slot] = app;
                    } else {
                        debug!("ignoring duplicate {}", app.unique_id());
                    }
                }
                None => {
                    slots.insert(key, kept.len());
                    kept.push(app);
                }
            }
        }
        self.apps = kept;
    }
}

fn dedup_key(data: &AppData, flags: DedupFlags) -> Option<String> {
    let mut parts = Vec::new();
    if flags.contains(DedupFlags::KEY_ID) {
        parts.push(data.id()?.to_string());
    }
    if flags.contains(DedupFlags::KEY_SOURCE) {
        parts.push(data.source_default()?.to_string());
    }
    if flags.contains(DedupFlags::KEY_VERSION) {
        parts.push(data.version.clone().unwrap_or_default());
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(":"))
}

fn is_better(candidate: &AppData, current: &AppData, flags: DedupFlags) -> bool {
    if candidate.priority != current.priority {
        return candidate.priority > current.priority;
    }
    flags.contains(DedupFlags::PREFER_INSTALLED)
        && candidate.state().is_installed()
        && !current.state().is_installed()
}

impl<'a> IntoIterator for &'a AppList {
    type Item = &'a Arc<App>;
    type IntoIter = std::slice::Iter<'a, Arc<App>>;

    fn into_iter(self) -> Self::IntoIter {
        self.apps.iter()
    }
}

impl FromIterator<Arc<App>> for AppList {
    fn from_iter<I: IntoIterator<Item = Arc<App>>>(iter: I) -> Self {
        let mut list = AppList::new();
        for app in iter {
            list.add(app);
        }
        list
    }
}
