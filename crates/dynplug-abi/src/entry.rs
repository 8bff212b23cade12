//! Author-side helpers for exporting Rust types as plugin objects.

use crate::types::{PluginObject, PluginVTable};

/// Lifecycle a Rust plugin implements.
///
/// Construction and destruction are ordinary Rust construction and `Drop`;
/// `init` and `fini` are the host-driven setup and teardown in between.
pub trait PluginEntry: 'static {
    /// Setup after construction.
    fn init(&mut self);

    /// Teardown before destruction.
    fn fini(&mut self);
}

/// Heap layout of a plugin object built from a Rust value.
///
/// The [`PluginObject`] header comes first, so a `*mut PluginBox<T>` can be
/// handed out as a `*mut PluginObject`.
#[repr(C)]
#[derive(Debug)]
pub struct PluginBox<T> {
    header: PluginObject,
    plugin: T,
}

impl<T: PluginEntry> PluginBox<T> {
    const VTABLE: PluginVTable = PluginVTable {
        init: Self::init_entry,
        fini: Self::fini_entry,
    };

    /// Box `plugin` and return the raw object for a `_construct` export.
    ///
    /// Ownership passes to the caller; release it with [`PluginBox::destroy`].
    pub fn into_raw(plugin: T) -> *mut PluginObject {
        let boxed = Box::new(Self {
            header: PluginObject {
                vtable: &Self::VTABLE,
            },
            plugin,
        });
        Box::into_raw(boxed).cast::<PluginObject>()
    }

    /// Borrow the Rust value behind a raw object.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `object` must be null or come from [`PluginBox::<T>::into_raw`] with
    /// the same `T`, must not have been destroyed, and must not be aliased
    /// mutably for the returned lifetime.
    pub unsafe fn plugin_mut<'a>(object: *mut PluginObject) -> Option<&'a mut T> {
        let boxed = object.cast::<Self>();
        // SAFETY: guaranteed by the caller.
        unsafe { boxed.as_mut() }.map(|boxed| &mut boxed.plugin)
    }

    /// Drop an object produced by [`PluginBox::into_raw`]. Null is ignored.
    ///
    /// # Safety
    ///
    /// `object` must be null or come from [`PluginBox::<T>::into_raw`] with
    /// the same `T`, and must not be used again afterwards.
    pub unsafe fn destroy(object: *mut PluginObject) {
        if object.is_null() {
            return;
        }
        // SAFETY: the pointer was produced by `Box::into_raw` for `Self`.
        drop(unsafe { Box::from_raw(object.cast::<Self>()) });
    }

    unsafe extern "C" fn init_entry(object: *mut PluginObject) {
        // SAFETY: the vtable is only reachable through objects of this `T`.
        if let Some(plugin) = unsafe { Self::plugin_mut(object) } {
            plugin.init();
        }
    }

    unsafe extern "C" fn fini_entry(object: *mut PluginObject) {
        // SAFETY: the vtable is only reachable through objects of this `T`.
        if let Some(plugin) = unsafe { Self::plugin_mut(object) } {
            plugin.fini();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        inits: u32,
        finis: u32,
    }

    impl PluginEntry for Counter {
        fn init(&mut self) {
            self.inits += 1;
        }

        fn fini(&mut self) {
            self.finis += 1;
        }
    }

    #[test]
    fn test_vtable_dispatch() {
        let object = PluginBox::into_raw(Counter::default());
        assert!(!object.is_null());

        // SAFETY: `object` was just produced by `into_raw`.
        let vtable = unsafe { &*(*object).vtable };
        // SAFETY: entries of the vtable of a live `Counter` object.
        unsafe { (vtable.init)(object) };
        // SAFETY: as above.
        unsafe { (vtable.init)(object) };
        // SAFETY: as above.
        unsafe { (vtable.fini)(object) };

        // SAFETY: `object` is live and not otherwise borrowed.
        let counter = unsafe { PluginBox::<Counter>::plugin_mut(object) };
        assert_eq!(counter.map(|c| (c.inits, c.finis)), Some((2, 1)));

        // SAFETY: `object` is destroyed exactly once.
        unsafe { PluginBox::<Counter>::destroy(object) };
    }

    #[test]
    fn test_null_is_ignored() {
        // SAFETY: null is explicitly accepted.
        unsafe { PluginBox::<Counter>::destroy(std::ptr::null_mut()) };
        // SAFETY: as above.
        let plugin = unsafe { PluginBox::<Counter>::plugin_mut(std::ptr::null_mut()) };
        assert!(plugin.is_none());
    }

    #[test]
    fn test_instances_share_vtable() {
        let first = PluginBox::into_raw(Counter::default());
        let second = PluginBox::into_raw(Counter::default());

        // SAFETY: both objects are live.
        let (a, b) = unsafe { ((*first).vtable, (*second).vtable) };
        assert!(std::ptr::eq(a, b));

        // SAFETY: each object is destroyed exactly once.
        unsafe { PluginBox::<Counter>::destroy(first) };
        // SAFETY: as above.
        unsafe { PluginBox::<Counter>::destroy(second) };
    }
}
