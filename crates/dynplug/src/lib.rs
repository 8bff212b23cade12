//! Runtime loading of shared libraries and the plugins they export.
//!
//! This crate lets a host extend itself at runtime without relinking:
//! - [`LibraryHandle`] maps a native image and resolves typed [`Function`]s
//!   that keep it mapped;
//! - [`LibraryRepository`] caches handles under caller-chosen names;
//! - [`PluginRepository`] builds [`NativePlugin`]s through each library's
//!   `<plugin>_construct` / `<plugin>_destruct` exports, optionally
//!   enumerated by a `<library>_plugins` discovery export.
//!
//! A library is never unmapped while anything resolved from it is still
//! reachable: handles, functions and plugins all share ownership of it.
//! Caches reject a second entry under a taken name instead of replacing it.
//!
//! # Security Considerations
//!
//! Loaded code runs with full process privileges and is NOT sandboxed.
//! Only load libraries from trusted locations.
//!
//! # Example
//!
//! ```rust,no_run
//! use dynplug::{LibraryRepository, Plugin, PluginRepository};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut plugins = PluginRepository::new(LibraryRepository::new());
//!     plugins.libraries_mut().load("editor", "/usr/lib/editor/libeditor_plugins.so")?;
//!
//!     for name in plugins.load_all_plugins("editor")? {
//!         plugins.get_plugin(&name)?.init();
//!     }
//!
//!     let spell = plugins.get_plugin("spell")?;
//!     spell.fini();
//!     Ok(())
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod library;
pub mod library_repository;
pub mod lifecycle;
pub mod plugin;
pub mod plugin_repository;
pub mod prelude;

pub use config::{LoadConfig, SymbolBinding, SymbolScope};
pub use error::{EntryKind, PluginError, Result};
pub use library::{Function, LibraryHandle};
pub use library_repository::LibraryRepository;
pub use lifecycle::{
    LifecycleEvent, LifecycleObserver, NoopObserver, SharedObserver, TracingObserver,
};
pub use plugin::{NativePlugin, Plugin};
pub use plugin_repository::{MAX_DISCOVERED_PLUGINS, PluginRepository};
