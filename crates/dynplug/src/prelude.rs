//! Convenience re-exports for common types.

pub use crate::config::{LoadConfig, SymbolBinding, SymbolScope};
pub use crate::error::{EntryKind, PluginError, Result};
pub use crate::library::{Function, LibraryHandle};
pub use crate::library_repository::LibraryRepository;
pub use crate::lifecycle::{LifecycleEvent, LifecycleObserver, SharedObserver};
pub use crate::plugin::{NativePlugin, Plugin};
pub use crate::plugin_repository::PluginRepository;
