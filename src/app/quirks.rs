// src/app/quirks.rs
//! Behavioral flags layered onto an app independently of its state

use crate::bitset::bitset;

bitset! {
    /// Orthogonal boolean attributes of an app
    ///
    /// Quirks only accumulate during a refine pass. Removing one is an
    /// explicit reset by the caller.
    pub struct Quirks: u64 {
        /// Placeholder identity, resolved against concrete results later
        const IS_WILDCARD = 1 << 0;
        /// Synthetic aggregate of other apps
        const IS_PROXY = 1 << 1;
        /// Comes from an officially sanctioned source
        const PROVENANCE = 1 << 2;
        /// Cannot be launched after install
        const NOT_LAUNCHABLE = 1 << 3;
        /// Never shown in any list
        const HIDE_EVERYWHERE = 1 << 4;
        /// Applying the update requires a reboot
        const NEEDS_REBOOT = 1 << 5;
        /// Cannot be removed
        const COMPULSORY = 1 << 6;
        /// Wildcard id also matches ids carrying a `prefix:` qualifier
        const MATCH_ANY_PREFIX = 1 << 7;
        const HAS_SOURCE = 1 << 8;
        const NOT_REVIEWABLE = 1 << 9;
        const DEVELOPER_VERIFIED = 1 << 10;
        const FROM_DEVELOPMENT_REPOSITORY = 1 << 11;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quirk_names() {
        let quirks = Quirks::IS_WILDCARD | Quirks::HIDE_EVERYWHERE;
        assert_eq!(quirks.names(), vec!["IS_WILDCARD", "HIDE_EVERYWHERE"]);
        assert_eq!(Quirks::from_name("provenance"), Some(Quirks::PROVENANCE));
    }
}
