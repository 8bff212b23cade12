//! Name-keyed cache of plugin instances built from cached libraries.
//!
//! A plugin library exports, by convention:
//!
//! - `<plugin>_construct` and `<plugin>_destruct` for each plugin;
//! - `<library>_plugins`, listing its plugin names, for bulk loading.
//!
//! The convention is fixed by [`dynplug_abi::symbol`].

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::CStr;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use dynplug_abi::{
    ConstructFn, DestructFn, DiscoveryFn, construct_symbol, destruct_symbol, discovery_symbol,
};

pub use dynplug_abi::MAX_DISCOVERED_PLUGINS;

use crate::error::{EntryKind, PluginError, Result};
use crate::library::LibraryHandle;
use crate::library_repository::LibraryRepository;
use crate::plugin::{NativePlugin, Plugin};

/// Cache of plugin instances keyed by plugin name.
///
/// Plugin names are unique across the whole repository, whichever library
/// they came from. The repository owns its [`LibraryRepository`]; libraries
/// must be loaded there before plugins can be built from them.
///
/// # Teardown
///
/// Dropping the repository releases every cached plugin first, then the
/// libraries. A plugin nobody else holds is destroyed right away with the
/// destructor bound at construction; one still held elsewhere is destroyed
/// when its last holder lets go, and keeps its library mapped until then.
pub struct PluginRepository {
    plugins: BTreeMap<String, Arc<NativePlugin>>,
    libraries: LibraryRepository,
}

impl PluginRepository {
    /// Create an empty plugin cache on top of `libraries`.
    pub fn new(libraries: LibraryRepository) -> Self {
        Self {
            plugins: BTreeMap::new(),
            libraries,
        }
    }

    /// The library cache plugins are resolved against.
    pub fn libraries(&self) -> &LibraryRepository {
        &self.libraries
    }

    /// Mutable access to the library cache, for loading libraries.
    pub fn libraries_mut(&mut self) -> &mut LibraryRepository {
        &mut self.libraries
    }

    /// Build plugin `plugin_name` from the library cached as `library_name`.
    ///
    /// Resolves `<plugin_name>_construct` and `<plugin_name>_destruct`, calls
    /// the constructor once, and caches the instance with the destructor
    /// bound to it. The library must already be loaded; this never opens one.
    ///
    /// # Errors
    ///
    /// - [`PluginError::DuplicateName`] if `plugin_name` is already cached;
    /// - [`PluginError::NotFound`] if `library_name` is not loaded;
    /// - [`PluginError::Symbol`] if either export is missing;
    /// - [`PluginError::ConstructionFailed`] if the constructor returns null.
    ///
    /// On error the repository is unchanged.
    pub fn load_plugin(
        &mut self,
        library_name: &str,
        plugin_name: &str,
    ) -> Result<Arc<NativePlugin>> {
        if self.plugins.contains_key(plugin_name) {
            return Err(PluginError::duplicate(EntryKind::Plugin, plugin_name));
        }

        let library = self.libraries.get(library_name)?;
        let plugin = Arc::new(construct(&library, plugin_name)?);
        self.plugins
            .insert(plugin_name.to_string(), Arc::clone(&plugin));

        tracing::info!(
            library = library_name,
            plugin = plugin_name,
            "Plugin loaded"
        );
        Ok(plugin)
    }

    /// Build every plugin listed by `<library_name>_plugins`.
    ///
    /// All or nothing: name collisions are checked before any constructor
    /// runs, and if a later plugin fails, the ones already built are
    /// destroyed and nothing is cached. Returns the loaded names in list order.
    ///
    /// # Errors
    ///
    /// - [`PluginError::NotFound`] if `library_name` is not loaded;
    /// - [`PluginError::Symbol`] if the discovery export, or any listed
    ///   plugin's construct/destruct export, is missing;
    /// - [`PluginError::InvalidDiscoveryEntry`] if the list is malformed;
    /// - [`PluginError::DuplicateName`] if a listed name is already cached or
    ///   listed twice;
    /// - [`PluginError::ConstructionFailed`] if a constructor returns null.
    pub fn load_all_plugins(&mut self, library_name: &str) -> Result<Vec<String>> {
        let library = self.libraries.get(library_name)?;
        let names = read_plugin_list(&library, library_name)?;

        let mut listed = BTreeSet::new();
        for name in &names {
            if self.plugins.contains_key(name) || !listed.insert(name.as_str()) {
                return Err(PluginError::duplicate(EntryKind::Plugin, name.as_str()));
            }
        }

        let mut staged = Vec::with_capacity(names.len());
        for name in &names {
            staged.push(construct(&library, name)?);
        }

        for plugin in staged {
            tracing::debug!(library = library_name, plugin = plugin.name(), "Plugin discovered");
            self.plugins
                .insert(plugin.name().to_string(), Arc::new(plugin));
        }

        tracing::info!(
            library = library_name,
            count = names.len(),
            "Plugins loaded from discovery list"
        );
        Ok(names)
    }

    /// Plugin names listed by `<library_name>_plugins`, without loading them.
    ///
    /// # Errors
    ///
    /// [`PluginError::NotFound`], [`PluginError::Symbol`] or
    /// [`PluginError::InvalidDiscoveryEntry`], as for
    /// [`load_all_plugins`](Self::load_all_plugins).
    pub fn discover(&self, library_name: &str) -> Result<Vec<String>> {
        let library = self.libraries.get(library_name)?;
        read_plugin_list(&library, library_name)
    }

    /// Cached plugin `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] if no plugin is cached under `name`.
    pub fn get_plugin(&self, name: &str) -> Result<Arc<NativePlugin>> {
        self.find_plugin(name)
            .ok_or_else(|| PluginError::not_found(EntryKind::Plugin, name))
    }

    /// Cached plugin `name`, or `None`.
    pub fn find_plugin(&self, name: &str) -> Option<Arc<NativePlugin>> {
        self.plugins.get(name).cloned()
    }

    /// Remove plugin `name` from the cache.
    ///
    /// The instance is destroyed once the returned reference, and any other
    /// reference callers still hold, is dropped. The name becomes free again.
    pub fn release_plugin(&mut self, name: &str) -> Option<Arc<NativePlugin>> {
        let plugin = self.plugins.remove(name)?;
        tracing::debug!(plugin = name, "Plugin released from repository");
        Some(plugin)
    }

    /// Whether a plugin is cached under `name`.
    pub fn contains_plugin(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Number of cached plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Cached plugin names in ascending order.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.plugins.keys().map(String::as_str)
    }
}

impl Drop for PluginRepository {
    fn drop(&mut self) {
        for (name, plugin) in std::mem::take(&mut self.plugins) {
            let others = Arc::strong_count(&plugin).saturating_sub(1);
            if others > 0 {
                tracing::debug!(plugin = %name, holders = others, "Plugin still referenced; destruction deferred");
            }
            drop(plugin);
        }
    }
}

impl fmt::Debug for PluginRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRepository")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("libraries", &self.libraries)
            .finish()
    }
}

/// Resolve the construct/destruct pair of `plugin_name` and build one instance.
///
/// Both symbols are resolved before the constructor runs, so a missing
/// destructor never leaks an instance.
fn construct(library: &LibraryHandle, plugin_name: &str) -> Result<NativePlugin> {
    // SAFETY: `ConstructFn` is the signature fixed by the plugin ABI.
    let constructor = unsafe { library.resolve::<ConstructFn>(&construct_symbol(plugin_name)) }?;
    // SAFETY: `DestructFn` is the signature fixed by the plugin ABI.
    let destructor = unsafe { library.resolve::<DestructFn>(&destruct_symbol(plugin_name)) }?;

    // SAFETY: the constructor takes no arguments; the library stays mapped
    // through `constructor`.
    let object = unsafe { (*constructor)() };
    let object = NonNull::new(object).ok_or_else(|| PluginError::ConstructionFailed {
        plugin: plugin_name.to_string(),
    })?;

    // SAFETY: `object` was just produced by the constructor paired with
    // `destructor` and is owned by nobody else.
    Ok(unsafe { NativePlugin::from_raw(plugin_name.to_string(), object, destructor) })
}

/// Run the discovery protocol of the library cached as `library_name`.
fn read_plugin_list(library: &LibraryHandle, library_name: &str) -> Result<Vec<String>> {
    // SAFETY: `DiscoveryFn` is the signature fixed by the plugin ABI.
    let list = unsafe { library.resolve::<DiscoveryFn>(&discovery_symbol(library_name)) }?;

    // SAFETY: the discovery function takes no arguments.
    let mut cursor = unsafe { (*list)() };
    let mut names = Vec::new();
    if cursor.is_null() {
        return Ok(names);
    }

    loop {
        let index = names.len();

        // SAFETY: the list is null-terminated and `cursor` has not passed
        // the terminator, nor the slot after the last allowed name.
        let entry = unsafe { *cursor };
        if entry.is_null() {
            break;
        }
        // SAFETY: non-null entries are NUL-terminated strings kept alive by
        // the library, which `list` keeps mapped.
        let name = unsafe { CStr::from_ptr(entry) };
        if name.is_empty() {
            break;
        }
        if index >= MAX_DISCOVERED_PLUGINS {
            return Err(PluginError::InvalidDiscoveryEntry {
                library: library_name.to_string(),
                index,
                reason: format!("more than {MAX_DISCOVERED_PLUGINS} names without a terminator"),
            });
        }
        let name = name
            .to_str()
            .map_err(|e| PluginError::InvalidDiscoveryEntry {
                library: library_name.to_string(),
                index,
                reason: e.to_string(),
            })?;
        names.push(name.to_owned());

        // SAFETY: `entry` was not the terminator, so the next slot exists.
        cursor = unsafe { cursor.add(1) };
    }

    tracing::debug!(library = library_name, count = names.len(), "Discovery list read");
    Ok(names)
}
