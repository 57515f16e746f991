//! Error types for the session reconciler.
//!
//! None of these propagate out of the reconciler: storage failures degrade to
//! no-ops and host failures are logged by the runtime. They exist so the
//! seams (storage backends, hosts) can report what went wrong.

use thiserror::Error;

/// Errors reported by a [`KeyValueStorage`](crate::KeyValueStorage) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Storage is disabled or inaccessible (e.g. private browsing).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The write would exceed the storage quota.
    #[error("storage quota exceeded writing {key}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
    },
}

/// Errors reported by a [`Host`](crate::Host) while executing an effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The partial-update client or the browser refused a navigation.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A custom event could not be dispatched.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// The DOM element an effect targets does not exist.
    #[error("element not found: {0}")]
    MissingElement(String),
}
