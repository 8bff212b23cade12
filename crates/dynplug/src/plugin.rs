//! Plugin contract and the native plugin instance.

use std::fmt;
use std::ptr::NonNull;

use dynplug_abi::{DestructFn, PluginObject, PluginVTable};
use parking_lot::Mutex;

use crate::library::{Function, LibraryHandle};
use crate::lifecycle::LifecycleEvent;

/// Capability object with host-driven setup and teardown.
///
/// The host calls [`init`](Plugin::init) after retrieving a freshly loaded
/// plugin and [`fini`](Plugin::fini) before releasing it. Repositories never
/// call either on their own.
pub trait Plugin {
    /// Logical name the plugin was loaded under.
    fn name(&self) -> &str;

    /// Setup after construction.
    fn init(&self);

    /// Teardown before destruction.
    fn fini(&self);
}

/// Plugin instance built by a library's `<name>_construct` export.
///
/// The instance pointer is opaque: it is only ever passed to the entries of
/// its own vtable and, exactly once, to the destructor resolved alongside the
/// constructor. That destructor also keeps the library mapped, so the
/// plugin never outlives the code that must destroy it.
///
/// Vtable calls on one instance never overlap: `init` and `fini` hold the
/// instance lock for the duration of the native call.
pub struct NativePlugin {
    name: String,
    object: NonNull<PluginObject>,
    destructor: Function<DestructFn>,
    calls: Mutex<()>,
}

// SAFETY: the ABI requires plugin objects to tolerate being used from any
// thread, one call at a time; the host never inspects their contents.
unsafe impl Send for NativePlugin {}
// SAFETY: every vtable call made through `&self` holds `calls`, so at most
// one thread is inside the plugin at a time. `Drop` has `&mut self`.
unsafe impl Sync for NativePlugin {}

impl NativePlugin {
    /// Take ownership of a freshly constructed object.
    ///
    /// # Safety
    ///
    /// `object` must come from the constructor paired with `destructor`, must
    /// start with a valid [`PluginObject`] header, and must not be owned by
    /// anything else.
    pub(crate) unsafe fn from_raw(
        name: String,
        object: NonNull<PluginObject>,
        destructor: Function<DestructFn>,
    ) -> Self {
        let library = destructor.library();
        library.observer().on_event(&LifecycleEvent::PluginConstructed {
            plugin: &name,
            library: library.path(),
        });
        Self {
            name,
            object,
            destructor,
            calls: Mutex::new(()),
        }
    }

    /// Library the plugin was built from.
    pub fn library(&self) -> &LibraryHandle {
        self.destructor.library()
    }

    /// Name of the destructor symbol bound to this instance.
    pub fn destructor_symbol(&self) -> &str {
        self.destructor.symbol()
    }

    /// Opaque instance pointer, for passing to library-specific exports.
    pub fn as_ptr(&self) -> *mut PluginObject {
        self.object.as_ptr()
    }

    fn vtable(&self) -> Option<&PluginVTable> {
        // SAFETY: `object` is live until drop and starts with a `PluginObject`
        // header whose vtable is either null or valid for the library's lifetime.
        let vtable = unsafe { self.object.as_ref() }.vtable;
        // SAFETY: see above; the destructor keeps the library mapped.
        unsafe { vtable.as_ref() }
    }
}

impl Plugin for NativePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self) {
        let _call = self.calls.lock();
        match self.vtable() {
            // SAFETY: vtable entry of this very object.
            Some(vtable) => unsafe { (vtable.init)(self.object.as_ptr()) },
            None => tracing::warn!(plugin = %self.name, "Plugin has no vtable; init skipped"),
        }
    }

    fn fini(&self) {
        let _call = self.calls.lock();
        match self.vtable() {
            // SAFETY: vtable entry of this very object.
            Some(vtable) => unsafe { (vtable.fini)(self.object.as_ptr()) },
            None => tracing::warn!(plugin = %self.name, "Plugin has no vtable; fini skipped"),
        }
    }
}

impl Drop for NativePlugin {
    fn drop(&mut self) {
        tracing::debug!(
            plugin = %self.name,
            destructor = self.destructor.symbol(),
            "Destroying native plugin"
        );
        // SAFETY: the destructor is the one paired with the constructor that
        // produced `object`, and `drop` runs exactly once.
        unsafe { (*self.destructor)(self.object.as_ptr()) };

        let library = self.destructor.library();
        library.observer().on_event(&LifecycleEvent::PluginDestroyed {
            plugin: &self.name,
            library: library.path(),
        });
    }
}

impl fmt::Debug for NativePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativePlugin")
            .field("name", &self.name)
            .field("library", &self.library().path())
            .field("destructor", &self.destructor.symbol())
            .finish()
    }
}
