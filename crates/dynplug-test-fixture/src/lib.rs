//! Plugin library loaded by the dynplug integration tests.
//!
//! Exports, following the dynplug ABI:
//!
//! | Plugin | Exports |
//! |--------|---------|
//! | `alpha`, `beta`, `gamma` | construct + destruct |
//! | `orphan` | construct only |
//! | `stillborn` | construct (returns null) + destruct |
//!
//! Discovery lists, one per logical library name the tests register this
//! file under: `fixture`, `empty`, `twice`, `partial`, `blank`, `garbled`,
//! `full` (the longest accepted list) and `endless` (one name too many, with
//! no terminator).
//!
//! Process-global counters let the tests observe what the host did. They
//! are shared by every handle to this image, so tests reading them must not
//! run concurrently.

use std::ffi::{CStr, c_char};
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dynplug_abi::{MAX_DISCOVERED_PLUGINS, PluginBox, PluginEntry, PluginNameList, PluginObject};

static LIVE_INSTANCES: AtomicUsize = AtomicUsize::new(0);
static DESTROYED_TOTAL: AtomicUsize = AtomicUsize::new(0);
static MISMATCHED_DESTRUCTS: AtomicUsize = AtomicUsize::new(0);
static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
static FINI_CALLS: AtomicUsize = AtomicUsize::new(0);
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct FixturePlugin {
    kind: &'static CStr,
    id: u64,
}

impl PluginEntry for FixturePlugin {
    fn init(&mut self) {
        INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn fini(&mut self) {
        FINI_CALLS.fetch_add(1, Ordering::SeqCst);
    }
}

fn build(kind: &'static CStr) -> *mut PluginObject {
    LIVE_INSTANCES.fetch_add(1, Ordering::SeqCst);
    PluginBox::into_raw(FixturePlugin {
        kind,
        id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
    })
}

/// # Safety
///
/// `object` must be null or come from [`build`].
unsafe fn destroy(expected: &'static CStr, object: *mut PluginObject) {
    // SAFETY: guaranteed by the caller.
    let Some(plugin) = (unsafe { PluginBox::<FixturePlugin>::plugin_mut(object) }) else {
        return;
    };
    if plugin.kind != expected {
        MISMATCHED_DESTRUCTS.fetch_add(1, Ordering::SeqCst);
    }
    // SAFETY: guaranteed by the caller; destroyed exactly once.
    unsafe { PluginBox::<FixturePlugin>::destroy(object) };
    LIVE_INSTANCES.fetch_sub(1, Ordering::SeqCst);
    DESTROYED_TOTAL.fetch_add(1, Ordering::SeqCst);
}

/// Factory of `alpha`.
#[unsafe(no_mangle)]
pub extern "C" fn alpha_construct() -> *mut PluginObject {
    build(c"alpha")
}

/// Destructor of `alpha`.
///
/// # Safety
///
/// `object` must come from a fixture constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn alpha_destruct(object: *mut PluginObject) {
    // SAFETY: forwarded caller contract.
    unsafe { destroy(c"alpha", object) }
}

/// Factory of `beta`.
#[unsafe(no_mangle)]
pub extern "C" fn beta_construct() -> *mut PluginObject {
    build(c"beta")
}

/// Destructor of `beta`.
///
/// # Safety
///
/// `object` must come from a fixture constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn beta_destruct(object: *mut PluginObject) {
    // SAFETY: forwarded caller contract.
    unsafe { destroy(c"beta", object) }
}

/// Factory of `gamma`.
#[unsafe(no_mangle)]
pub extern "C" fn gamma_construct() -> *mut PluginObject {
    build(c"gamma")
}

/// Destructor of `gamma`.
///
/// # Safety
///
/// `object` must come from a fixture constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gamma_destruct(object: *mut PluginObject) {
    // SAFETY: forwarded caller contract.
    unsafe { destroy(c"gamma", object) }
}

/// Factory of `orphan`, which has no destructor export.
#[unsafe(no_mangle)]
pub extern "C" fn orphan_construct() -> *mut PluginObject {
    build(c"orphan")
}

/// Factory of `stillborn`; always fails.
#[unsafe(no_mangle)]
pub extern "C" fn stillborn_construct() -> *mut PluginObject {
    ptr::null_mut()
}

/// Destructor of `stillborn`.
///
/// # Safety
///
/// `object` must come from a fixture constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn stillborn_destruct(object: *mut PluginObject) {
    // SAFETY: forwarded caller contract.
    unsafe { destroy(c"stillborn", object) }
}

static FIXTURE_PLUGINS: PluginNameList<4> = PluginNameList::new([
    c"alpha".as_ptr(),
    c"beta".as_ptr(),
    c"gamma".as_ptr(),
    ptr::null(),
]);
static EMPTY_PLUGINS: PluginNameList<1> = PluginNameList::new([ptr::null()]);
static TWICE_PLUGINS: PluginNameList<3> =
    PluginNameList::new([c"alpha".as_ptr(), c"alpha".as_ptr(), ptr::null()]);
static PARTIAL_PLUGINS: PluginNameList<4> = PluginNameList::new([
    c"alpha".as_ptr(),
    c"beta".as_ptr(),
    c"orphan".as_ptr(),
    ptr::null(),
]);
static BLANK_PLUGINS: PluginNameList<4> = PluginNameList::new([
    c"gamma".as_ptr(),
    c"".as_ptr(),
    c"alpha".as_ptr(),
    ptr::null(),
]);
static GARBLED_PLUGINS: PluginNameList<3> =
    PluginNameList::new([c"beta".as_ptr(), c"\xff\xfe".as_ptr(), ptr::null()]);

/// `N` copies of `name`, the last one replaced by the terminator.
const fn terminated<const N: usize>(name: &'static CStr) -> [*const c_char; N] {
    let mut names = [name.as_ptr(); N];
    names[N - 1] = ptr::null();
    names
}

static FULL_PLUGINS: PluginNameList<{ MAX_DISCOVERED_PLUGINS + 1 }> =
    PluginNameList::new(terminated(c"alpha"));
static ENDLESS_PLUGINS: PluginNameList<{ MAX_DISCOVERED_PLUGINS + 1 }> =
    PluginNameList::new([c"alpha".as_ptr(); MAX_DISCOVERED_PLUGINS + 1]);

/// Discovery list when registered as `fixture`.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_plugins() -> *const *const c_char {
    FIXTURE_PLUGINS.as_ptr()
}

/// Discovery list when registered as `empty`.
#[unsafe(no_mangle)]
pub extern "C" fn empty_plugins() -> *const *const c_char {
    EMPTY_PLUGINS.as_ptr()
}

/// Discovery list naming one plugin twice.
#[unsafe(no_mangle)]
pub extern "C" fn twice_plugins() -> *const *const c_char {
    TWICE_PLUGINS.as_ptr()
}

/// Discovery list whose last plugin cannot be loaded.
#[unsafe(no_mangle)]
pub extern "C" fn partial_plugins() -> *const *const c_char {
    PARTIAL_PLUGINS.as_ptr()
}

/// Discovery list terminated early by an empty string.
#[unsafe(no_mangle)]
pub extern "C" fn blank_plugins() -> *const *const c_char {
    BLANK_PLUGINS.as_ptr()
}

/// Discovery list with a name that is not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn garbled_plugins() -> *const *const c_char {
    GARBLED_PLUGINS.as_ptr()
}

/// Discovery list with the most names a host accepts.
#[unsafe(no_mangle)]
pub extern "C" fn full_plugins() -> *const *const c_char {
    FULL_PLUGINS.as_ptr()
}

/// Discovery list that is still going past the accepted length.
#[unsafe(no_mangle)]
pub extern "C" fn endless_plugins() -> *const *const c_char {
    ENDLESS_PLUGINS.as_ptr()
}

/// Plain exported function.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// Instances constructed and not yet destroyed.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_live_instances() -> usize {
    LIVE_INSTANCES.load(Ordering::SeqCst)
}

/// Instances destroyed so far.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_destroyed_total() -> usize {
    DESTROYED_TOTAL.load(Ordering::SeqCst)
}

/// Destructor calls that received another plugin's instance.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_mismatched_destructs() -> usize {
    MISMATCHED_DESTRUCTS.load(Ordering::SeqCst)
}

/// `init` calls so far.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_init_calls() -> usize {
    INIT_CALLS.load(Ordering::SeqCst)
}

/// `fini` calls so far.
#[unsafe(no_mangle)]
pub extern "C" fn fixture_fini_calls() -> usize {
    FINI_CALLS.load(Ordering::SeqCst)
}

/// Plugin kind of a live instance, or null.
///
/// # Safety
///
/// `object` must be null or a live instance from a fixture constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fixture_instance_kind(object: *mut PluginObject) -> *const c_char {
    // SAFETY: forwarded caller contract.
    match unsafe { PluginBox::<FixturePlugin>::plugin_mut(object) } {
        Some(plugin) => plugin.kind.as_ptr(),
        None => ptr::null(),
    }
}

/// Unique id of a live instance, or 0.
///
/// # Safety
///
/// `object` must be null or a live instance from a fixture constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fixture_instance_id(object: *mut PluginObject) -> u64 {
    // SAFETY: forwarded caller contract.
    match unsafe { PluginBox::<FixturePlugin>::plugin_mut(object) } {
        Some(plugin) => plugin.id,
        None => 0,
    }
}
