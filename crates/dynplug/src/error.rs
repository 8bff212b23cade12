//! Error types for library and plugin loading.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which cache an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// An entry of a [`LibraryRepository`](crate::LibraryRepository).
    Library,
    /// An entry of a [`PluginRepository`](crate::PluginRepository).
    Plugin,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Library => f.write_str("library"),
            EntryKind::Plugin => f.write_str("plugin"),
        }
    }
}

/// Error type for library and plugin operations.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The native image could not be mapped or linked.
    #[error("failed to load library {path:?}: {source}")]
    Load {
        /// Path passed to the loader.
        path: PathBuf,
        /// Loader diagnostics.
        #[source]
        source: libloading::Error,
    },

    /// A named export is missing, or the library is no longer open.
    #[error("failed to resolve symbol `{symbol}` in {library:?}: {reason}")]
    Symbol {
        /// Symbol that was looked up.
        symbol: String,
        /// Path of the library searched.
        library: PathBuf,
        /// Loader diagnostics.
        reason: String,
    },

    /// A cache already holds an entry under this name.
    #[error("{kind} `{name}` is already loaded")]
    DuplicateName {
        /// Cache that rejected the insert.
        kind: EntryKind,
        /// Name that was already taken.
        name: String,
    },

    /// A strict lookup found no entry under this name.
    #[error("{kind} `{name}` is not loaded")]
    NotFound {
        /// Cache that was searched.
        kind: EntryKind,
        /// Name that was looked up.
        name: String,
    },

    /// A plugin factory returned null.
    #[error("constructor of plugin `{plugin}` returned null")]
    ConstructionFailed {
        /// Plugin whose factory failed.
        plugin: String,
    },

    /// A discovery list entry could not be read.
    #[error("invalid entry {index} in plugin list of library `{library}`: {reason}")]
    InvalidDiscoveryEntry {
        /// Logical name of the library.
        library: String,
        /// Zero-based position in the list.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// An explicit close was requested while other holders keep the image mapped.
    #[error("library {path:?} is still in use by {holders} other holder(s)")]
    LibraryInUse {
        /// Path of the library.
        path: PathBuf,
        /// Holders left after releasing the caller's reference.
        holders: usize,
    },

    /// The native unmap call reported an error.
    #[error("failed to close library {path:?}: {source}")]
    Close {
        /// Path of the library.
        path: PathBuf,
        /// Loader diagnostics.
        #[source]
        source: libloading::Error,
    },
}

impl PluginError {
    pub(crate) fn duplicate(kind: EntryKind, name: impl Into<String>) -> Self {
        PluginError::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn not_found(kind: EntryKind, name: impl Into<String>) -> Self {
        PluginError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether this is a duplicate-name rejection.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PluginError::DuplicateName { .. })
    }

    /// Whether this is a failed strict lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PluginError::NotFound { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PluginError>;
