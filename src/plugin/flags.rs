// src/plugin/flags.rs
//! Flag sets passed to plugin operations
//!
//! [`RefineFlags`] keeps the bit positions used by existing callers of the
//! refine interface, so raw values can be exchanged with them unchanged.

use crate::bitset::bitset;

bitset! {
    /// Categories of data a caller needs from a refine pass
    ///
    /// Plugins skip expensive work for categories that are not requested.
    pub struct RefineFlags: u64 {
        const NONE = 0;
        const USE_HISTORY = 1 << 0;
        const LICENSE = 1 << 1;
        const URL = 1 << 2;
        const DESCRIPTION = 1 << 3;
        const SIZE = 1 << 4;
        const RATING = 1 << 5;
        const VERSION = 1 << 6;
        const HISTORY = 1 << 7;
        const SETUP_ACTION = 1 << 8;
        const UPDATE_DETAILS = 1 << 9;
        const ORIGIN = 1 << 10;
        const RELATED = 1 << 11;
        const MENU_PATH = 1 << 12;
        const ADDONS = 1 << 13;
        const ALLOW_PACKAGES = 1 << 14;
        const UPDATE_SEVERITY = 1 << 15;
        const UPGRADE_REMOVED = 1 << 16;
        const PROVENANCE = 1 << 17;
        const REVIEWS = 1 << 18;
        const REVIEW_RATINGS = 1 << 19;
        const KEY_COLORS = 1 << 20;
        const ICON = 1 << 21;
        const PERMISSIONS = 1 << 22;
        const ORIGIN_HOSTNAME = 1 << 23;
        const ORIGIN_UI = 1 << 24;
        const RUNTIME = 1 << 25;
        const SCREENSHOTS = 1 << 26;
    }
}

impl RefineFlags {
    /// Add the categories that the requested ones depend on
    ///
    /// The origin hostname and UI name need the origin, and sizes need the
    /// runtime to be known.
    pub fn with_implied(self) -> Self {
        let mut flags = self;
        if flags.intersects(RefineFlags::ORIGIN_HOSTNAME | RefineFlags::ORIGIN_UI) {
            flags.insert(RefineFlags::ORIGIN);
        }
        if flags.contains(RefineFlags::SIZE) {
            flags.insert(RefineFlags::RUNTIME);
        }
        // Key colors are computed from the loaded icon
        if flags.contains(RefineFlags::KEY_COLORS) {
            flags.insert(RefineFlags::ICON);
        }
        flags
    }

    /// Parse a comma separated list such as `icon,license`
    pub fn parse_list(list: &str) -> Option<Self> {
        let mut flags = RefineFlags::NONE;
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            flags.insert(RefineFlags::from_name(name)?);
        }
        Some(flags)
    }
}

bitset! {
    /// Execution hints for a refine job
    pub struct RefineJobFlags: u32 {
        const NONE = 0;
        /// A user is waiting; background work may run at foreground priority
        const INTERACTIVE = 1 << 0;
        /// Drop wildcards that no plugin resolved
        const FILTER_WILDCARDS = 1 << 1;
    }
}

bitset! {
    /// What a refresh should fetch
    pub struct RefreshFlags: u32 {
        const NONE = 0;
        const METADATA = 1 << 0;
        const PAYLOAD = 1 << 1;
        const INTERACTIVE = 1 << 2;
    }
}
