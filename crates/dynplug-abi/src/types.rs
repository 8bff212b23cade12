//! `#[repr(C)]` types crossing the host/library boundary.

use std::ffi::c_char;

/// Factory exported as `<plugin>_construct`.
///
/// Returns a new plugin object, or null if construction failed.
pub type ConstructFn = unsafe extern "C" fn() -> *mut PluginObject;

/// Destructor exported as `<plugin>_destruct`.
///
/// Receives an object produced by the matching [`ConstructFn`], exactly once.
pub type DestructFn = unsafe extern "C" fn(*mut PluginObject);

/// Discovery function exported as `<library>_plugins`.
///
/// Returns an array of NUL-terminated plugin names. The array ends at the
/// first null pointer or empty string. The storage must outlive the library.
pub type DiscoveryFn = unsafe extern "C" fn() -> *const *const c_char;

/// Most names a [`DiscoveryFn`] list may hold.
///
/// The terminator must follow at the latest in the slot after the last
/// allowed name; hosts reject a list that still has a name there instead of
/// reading further.
pub const MAX_DISCOVERED_PLUGINS: usize = 4096;

/// Lifecycle entry points of a plugin object.
///
/// # ABI Stability
///
/// Two function pointers, in this order. The layout is guaranteed stable.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PluginVTable {
    /// Called by the host after construction.
    pub init: unsafe extern "C" fn(*mut PluginObject),
    /// Called by the host before destruction.
    pub fini: unsafe extern "C" fn(*mut PluginObject),
}

/// Header every plugin object starts with.
///
/// The rest of the object is private to the library. Hosts treat a
/// `*mut PluginObject` as an opaque token that may only be handed back to
/// the vtable entries or to the bound destructor.
#[repr(C)]
#[derive(Debug)]
pub struct PluginObject {
    /// Vtable shared by all instances of one plugin type. Must not be null.
    pub vtable: *const PluginVTable,
}

static_assertions::const_assert_eq!(
    std::mem::size_of::<PluginObject>(),
    std::mem::size_of::<usize>()
);
static_assertions::const_assert_eq!(
    std::mem::size_of::<PluginVTable>(),
    2 * std::mem::size_of::<usize>()
);

/// Static, null-terminated list of plugin names for a discovery function.
///
/// ```
/// use dynplug_abi::PluginNameList;
/// use std::ffi::c_char;
///
/// static PLUGINS: PluginNameList<3> =
///     PluginNameList::new([c"spell".as_ptr(), c"format".as_ptr(), std::ptr::null()]);
///
/// #[unsafe(no_mangle)]
/// pub extern "C" fn editor_plugins() -> *const *const c_char {
///     PLUGINS.as_ptr()
/// }
/// ```
#[repr(transparent)]
#[derive(Debug)]
pub struct PluginNameList<const N: usize>([*const c_char; N]);

// SAFETY: the list only holds pointers to immutable `'static` C string
// literals and is never written after construction.
unsafe impl<const N: usize> Sync for PluginNameList<N> {}

impl<const N: usize> PluginNameList<N> {
    /// Wrap an array of name pointers. The last entry should be null.
    pub const fn new(names: [*const c_char; N]) -> Self {
        Self(names)
    }

    /// Pointer to the first entry, as returned by a [`DiscoveryFn`].
    pub const fn as_ptr(&self) -> *const *const c_char {
        self.0.as_ptr()
    }

    /// Number of entries, terminator included.
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether the list holds no entries at all.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    static NAMES: PluginNameList<3> =
        PluginNameList::new([c"a".as_ptr(), c"b".as_ptr(), std::ptr::null()]);

    #[test]
    fn test_name_list_layout() {
        assert_eq!(NAMES.len(), 3);
        assert!(!NAMES.is_empty());
        assert_eq!(
            std::mem::size_of::<PluginNameList<3>>(),
            3 * std::mem::size_of::<usize>()
        );
    }

    #[test]
    fn test_name_list_walk() {
        let mut names = Vec::new();
        let mut cursor = NAMES.as_ptr();
        loop {
            // SAFETY: `cursor` stays within `NAMES`, which is null-terminated.
            let entry = unsafe { *cursor };
            if entry.is_null() {
                break;
            }
            // SAFETY: entries are C string literals.
            let name = unsafe { CStr::from_ptr(entry) };
            names.push(name.to_string_lossy().into_owned());
            // SAFETY: the terminator has not been reached yet.
            cursor = unsafe { cursor.add(1) };
        }
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
