// src/error.rs
//! Error types for the software center engine
//!
//! Every fallible operation in the crate returns [`Result`]. Errors carry
//! full detail for diagnostic logs; callers rendering a user interface
//! should only show [`Error::category`].

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by plugins and the orchestration engine
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid plugin setup (ordering cycle, duplicate names, bad config file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A plugin cannot serve the requested filter combination
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// The plugin does not implement the requested operation
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external tool could not be run or exited with failure
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// A network resource could not be fetched
    #[error("Download failed: {0}")]
    Download(String),

    /// Malformed output from an external tool or catalog
    #[error("Invalid data: {0}")]
    DataFormat(String),

    /// The operation was cancelled before it completed
    #[error("Operation was cancelled")]
    Cancelled,

    /// The operation hit its deadline
    #[error("Operation timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// Requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Settings store failure
    #[error("Settings error: {0}")]
    Settings(String),

    /// A plugin-level failure, wrapped with the plugin name
    #[error("Plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: Box<Error>,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error category suitable for display to end users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Cancelled,
    Configuration,
    Network,
    Io,
    InvalidData,
    NotSupported,
    Failed,
}

impl ErrorCategory {
    /// Stable string form of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::Io => "io",
            Self::InvalidData => "invalid-data",
            Self::NotSupported => "not-supported",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Wrap an error with the name of the plugin that produced it
    ///
    /// Cancellation is passed through unchanged so callers can match on it.
    pub fn plugin(plugin: impl Into<String>, source: Error) -> Self {
        if source.is_cancelled() {
            return source;
        }
        Error::Plugin {
            plugin: plugin.into(),
            source: Box::new(source),
        }
    }

    /// Shorthand for a failed external command
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Map this error to a coarse user-facing category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Cancelled | Error::TimedOut(_) => ErrorCategory::Cancelled,
            Error::Configuration(_) | Error::Settings(_) | Error::Toml(_) => {
                ErrorCategory::Configuration
            }
            Error::UnsupportedQuery(_) | Error::NotSupported(_) => ErrorCategory::NotSupported,
            Error::Io(_) | Error::CommandFailed { .. } => ErrorCategory::Io,
            Error::Download(_) => ErrorCategory::Network,
            Error::DataFormat(_) | Error::Json(_) => ErrorCategory::InvalidData,
            Error::NotFound(_) => ErrorCategory::Failed,
            Error::Plugin { source, .. } => source.category(),
        }
    }

    /// True for cancellation and deadline expiry
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled | Error::TimedOut(_) => true,
            Error::Plugin { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// True for failures of external I/O that should not abort a batch
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Io(_) | Error::CommandFailed { .. } | Error::Download(_) => true,
            Error::Plugin { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// True when a plugin declined the request rather than failing it
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::UnsupportedQuery(_) | Error::NotSupported(_) => true,
            Error::Plugin { source, .. } => source.is_unsupported(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_counts_as_cancellation() {
        let err = Error::TimedOut(Duration::from_secs(2));
        assert!(err.is_cancelled());
        assert_eq!(err.category(), ErrorCategory::Cancelled);
        assert!(err.to_string().contains("2000ms"));
    }

    #[test]
    fn test_plugin_wrapper_keeps_category() {
        let err = Error::plugin("dpkg", Error::DataFormat("too few fields".into()));
        assert_eq!(err.category(), ErrorCategory::InvalidData);
        assert!(err.to_string().contains("dpkg"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_plugin_wrapper_passes_cancellation_through() {
        let err = Error::plugin("icons", Error::Cancelled);
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::command("dpkg-deb", "exit status 2").is_transient());
        assert!(Error::Download("timeout".into()).is_transient());
        assert!(!Error::Configuration("cycle".into()).is_transient());
        assert_eq!(Error::Download("x".into()).category(), ErrorCategory::Network);
    }
}
