//! Shared helpers for tests that load the `dynplug-test-fixture` cdylib.

#![expect(dead_code, reason = "each test binary uses a different subset")]

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::error::Error;
use std::ffi::{CStr, c_char};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::SystemTime;

use dynplug::{Function, LibraryHandle, LifecycleEvent, LifecycleObserver, NativePlugin};
use dynplug_abi::PluginObject;
use parking_lot::{Mutex, MutexGuard};

pub type TestResult = Result<(), Box<dyn Error>>;

static FIXTURE_LOCK: Mutex<()> = Mutex::new(());

/// Serialise tests that read the fixture's process-global counters.
pub fn serial() -> MutexGuard<'static, ()> {
    FIXTURE_LOCK.lock()
}

/// Path of the fixture cdylib built next to the running test binary.
pub fn fixture_path() -> Result<PathBuf, Box<dyn Error>> {
    let exe = std::env::current_exe()?;
    let deps = exe.parent().ok_or("test binary has no parent directory")?;

    let mut search = vec![deps.to_path_buf()];
    if let Some(profile) = deps.parent() {
        search.push(profile.to_path_buf());
    }

    let prefix = format!("{DLL_PREFIX}dynplug_test_fixture");
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for dir in &search {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_fixture(&path, &prefix) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().is_none_or(|(best, _)| modified > *best) {
                newest = Some((modified, path));
            }
        }
    }

    newest.map(|(_, path)| path).ok_or_else(|| {
        format!(
            "fixture library not found near {}; build it with `cargo build -p dynplug-test-fixture`",
            deps.display()
        )
        .into()
    })
}

fn is_fixture(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(prefix) && name.ends_with(DLL_SUFFIX))
}

type Probe = unsafe extern "C" fn() -> usize;

/// Reads the fixture's global counters through its own exports.
pub struct FixtureProbe {
    handle: LibraryHandle,
    live: Function<Probe>,
    destroyed: Function<Probe>,
    mismatched: Function<Probe>,
    inits: Function<Probe>,
    finis: Function<Probe>,
    kind: Function<unsafe extern "C" fn(*mut PluginObject) -> *const c_char>,
    id: Function<unsafe extern "C" fn(*mut PluginObject) -> u64>,
}

impl FixtureProbe {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let handle = LibraryHandle::open(fixture_path()?)?;
        // SAFETY: signatures match the fixture's exports.
        let live = unsafe { handle.resolve::<Probe>("fixture_live_instances") }?;
        // SAFETY: as above.
        let destroyed = unsafe { handle.resolve::<Probe>("fixture_destroyed_total") }?;
        // SAFETY: as above.
        let mismatched = unsafe { handle.resolve::<Probe>("fixture_mismatched_destructs") }?;
        // SAFETY: as above.
        let inits = unsafe { handle.resolve::<Probe>("fixture_init_calls") }?;
        // SAFETY: as above.
        let finis = unsafe { handle.resolve::<Probe>("fixture_fini_calls") }?;
        // SAFETY: as above.
        let kind = unsafe { handle.resolve("fixture_instance_kind") }?;
        // SAFETY: as above.
        let id = unsafe { handle.resolve("fixture_instance_id") }?;
        Ok(Self {
            handle,
            live,
            destroyed,
            mismatched,
            inits,
            finis,
            kind,
            id,
        })
    }

    pub fn handle(&self) -> &LibraryHandle {
        &self.handle
    }

    pub fn live(&self) -> usize {
        // SAFETY: argument-free counter read.
        unsafe { (*self.live)() }
    }

    pub fn destroyed(&self) -> usize {
        // SAFETY: argument-free counter read.
        unsafe { (*self.destroyed)() }
    }

    pub fn mismatched(&self) -> usize {
        // SAFETY: argument-free counter read.
        unsafe { (*self.mismatched)() }
    }

    pub fn inits(&self) -> usize {
        // SAFETY: argument-free counter read.
        unsafe { (*self.inits)() }
    }

    pub fn finis(&self) -> usize {
        // SAFETY: argument-free counter read.
        unsafe { (*self.finis)() }
    }

    /// Plugin kind recorded by the constructor that built `plugin`.
    pub fn kind_of(&self, plugin: &NativePlugin) -> Option<String> {
        // SAFETY: `plugin` is a live fixture instance.
        let kind = unsafe { (*self.kind)(plugin.as_ptr()) };
        if kind.is_null() {
            return None;
        }
        // SAFETY: kinds are static C string literals.
        let kind = unsafe { CStr::from_ptr(kind) };
        Some(kind.to_string_lossy().into_owned())
    }

    /// Unique id assigned to `plugin` at construction.
    pub fn id_of(&self, plugin: &NativePlugin) -> u64 {
        // SAFETY: `plugin` is a live fixture instance.
        unsafe { (*self.id)(plugin.as_ptr()) }
    }
}

/// Observer that records every event as its display string.
#[derive(Default)]
pub struct Recorder {
    events: StdMutex<Vec<String>>,
}

impl Recorder {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl LifecycleObserver for Recorder {
    fn on_event(&self, event: &LifecycleEvent<'_>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.to_string());
        }
    }
}
