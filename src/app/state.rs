// src/app/state.rs
//! App lifecycle state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an app
///
/// Plugins learn progressively more about an app, so a state may only move
/// towards a more specific value. `Installing` and `Removing` are transient
/// states held while a transaction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppState {
    #[default]
    Unknown,
    Available,
    AvailableLocal,
    Installed,
    Updatable,
    UpdatableLive,
    Installing,
    Removing,
    Unavailable,
}

impl AppState {
    /// Whether a transition from `self` to `next` is legal
    ///
    /// Re-setting the current state is always allowed. Nothing may move
    /// back to `Unknown`, and any state may become `Unavailable`.
    pub fn can_transition_to(self, next: AppState) -> bool {
        use AppState::*;

        if self == next || next == Unavailable {
            return true;
        }
        match self {
            Unknown => matches!(next, Available | AvailableLocal | Installed),
            Available => matches!(next, Updatable | UpdatableLive | Installing),
            AvailableLocal => matches!(next, Installing),
            Installed => matches!(next, Updatable | UpdatableLive | Removing),
            Updatable | UpdatableLive => matches!(next, Installing | Removing),
            Installing => matches!(next, Installed | Available | AvailableLocal),
            Removing => matches!(next, Available | Installed),
            Unavailable => false,
        }
    }

    /// True for states where the app is present on the system
    pub fn is_installed(self) -> bool {
        matches!(
            self,
            AppState::Installed | AppState::Updatable | AppState::UpdatableLive | AppState::Removing
        )
    }

    /// True for states that offer an update
    pub fn is_updatable(self) -> bool {
        matches!(self, AppState::Updatable | AppState::UpdatableLive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppState::Unknown => "unknown",
            AppState::Available => "available",
            AppState::AvailableLocal => "available-local",
            AppState::Installed => "installed",
            AppState::Updatable => "updatable",
            AppState::UpdatableLive => "updatable-live",
            AppState::Installing => "installing",
            AppState::Removing => "removing",
            AppState::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
