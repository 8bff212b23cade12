//! Name-keyed cache of opened libraries.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::path::Path;

use crate::config::LoadConfig;
use crate::error::{EntryKind, PluginError, Result};
use crate::library::LibraryHandle;
use crate::lifecycle::{SharedObserver, default_observer};

/// Cache of libraries keyed by a caller-chosen logical name.
///
/// Each name is loaded at most once. Loading under a name that is already
/// taken is an error, never a replacement.
pub struct LibraryRepository {
    libraries: BTreeMap<String, LibraryHandle>,
    config: LoadConfig,
    observer: SharedObserver,
}

impl LibraryRepository {
    /// Create an empty repository with the default configuration.
    pub fn new() -> Self {
        Self {
            libraries: BTreeMap::new(),
            config: LoadConfig::default(),
            observer: default_observer(),
        }
    }

    /// Use `config` for every library opened from now on.
    pub fn with_config(mut self, config: LoadConfig) -> Self {
        self.config = config;
        self
    }

    /// Report lifecycle events of libraries opened from now on, and of the
    /// plugins built from them, to `observer`.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Open `path` and cache it under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::DuplicateName`] if `name` is already taken; the
    /// existing entry is left untouched and `path` is not opened. Returns
    /// [`PluginError::Load`] if the image cannot be mapped.
    pub fn load(&mut self, name: &str, path: impl AsRef<Path>) -> Result<LibraryHandle> {
        let path = path.as_ref();
        match self.libraries.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                tracing::debug!(
                    name,
                    requested = %path.display(),
                    loaded = %existing.get().path().display(),
                    "Library name already taken"
                );
                Err(PluginError::duplicate(EntryKind::Library, name))
            }
            Entry::Vacant(slot) => {
                let handle =
                    LibraryHandle::open_with(path, &self.config, self.observer.clone())?;
                tracing::info!(name, path = %path.display(), "Library registered");
                Ok(slot.insert(handle).clone())
            }
        }
    }

    /// Cached handle for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] if no library is cached under `name`.
    pub fn get(&self, name: &str) -> Result<LibraryHandle> {
        self.find(name)
            .ok_or_else(|| PluginError::not_found(EntryKind::Library, name))
    }

    /// Cached handle for `name`, or `None`.
    pub fn find(&self, name: &str) -> Option<LibraryHandle> {
        self.libraries.get(name).cloned()
    }

    /// Whether a library is cached under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    /// Number of cached libraries.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Whether no library is cached.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Cached names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.libraries.keys().map(String::as_str)
    }

    /// Configuration used for new libraries.
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Observer handed to new libraries.
    pub fn observer(&self) -> &SharedObserver {
        &self.observer
    }
}

impl Default for LibraryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LibraryRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryRepository")
            .field("libraries", &self.libraries)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
