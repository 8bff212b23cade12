//! Construction and destruction hook for libraries and plugins.
//!
//! Repositories report every library open/close and every plugin
//! construct/destroy to a [`LifecycleObserver`]. The default
//! [`TracingObserver`] forwards events to `tracing`; hosts can inject their
//! own through [`LibraryRepository::with_observer`](crate::LibraryRepository::with_observer).

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Lifecycle event of a library or plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent<'a> {
    /// A native image was mapped.
    LibraryOpened {
        /// Path the image was opened from.
        path: &'a Path,
    },

    /// A native image was unmapped.
    ///
    /// Emitted when the last holder releases it.
    LibraryClosed {
        /// Path the image was opened from.
        path: &'a Path,
    },

    /// A plugin factory returned a new instance.
    PluginConstructed {
        /// Plugin name.
        plugin: &'a str,
        /// Path of the library that built it.
        library: &'a Path,
    },

    /// A plugin instance was handed to its bound destructor.
    PluginDestroyed {
        /// Plugin name.
        plugin: &'a str,
        /// Path of the library whose destructor ran.
        library: &'a Path,
    },
}

impl fmt::Display for LifecycleEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::LibraryOpened { path } => write!(f, "library opened: {}", path.display()),
            LifecycleEvent::LibraryClosed { path } => write!(f, "library closed: {}", path.display()),
            LifecycleEvent::PluginConstructed { plugin, library } => {
                write!(f, "plugin constructed: {plugin} ({})", library.display())
            }
            LifecycleEvent::PluginDestroyed { plugin, library } => {
                write!(f, "plugin destroyed: {plugin} ({})", library.display())
            }
        }
    }
}

/// Receiver of [`LifecycleEvent`]s.
///
/// # Thread Safety
///
/// Observers are shared by every handle a repository hands out, and a
/// handle may be dropped on any thread.
pub trait LifecycleObserver: Send + Sync {
    /// Handle one event. Must not panic.
    fn on_event(&self, event: &LifecycleEvent<'_>);
}

/// Shared observer reference.
pub type SharedObserver = Arc<dyn LifecycleObserver>;

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn on_event(&self, event: &LifecycleEvent<'_>) {
        match event {
            LifecycleEvent::LibraryOpened { path } => {
                tracing::debug!(path = %path.display(), "library opened");
            }
            LifecycleEvent::LibraryClosed { path } => {
                tracing::debug!(path = %path.display(), "library closed");
            }
            LifecycleEvent::PluginConstructed { plugin, library } => {
                tracing::debug!(plugin = %plugin, library = %library.display(), "plugin constructed");
            }
            LifecycleEvent::PluginDestroyed { plugin, library } => {
                tracing::debug!(plugin = %plugin, library = %library.display(), "plugin destroyed");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {
    fn on_event(&self, _event: &LifecycleEvent<'_>) {}
}

/// Observer used when none is injected.
pub fn default_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}
