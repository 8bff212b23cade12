//! C ABI contract between a dynplug host and the shared libraries it loads.
//!
//! A plugin library exports, by naming convention:
//!
//! | Symbol | Signature | Purpose |
//! |--------|-----------|---------|
//! | `<plugin>_construct` | [`ConstructFn`] | create one plugin instance |
//! | `<plugin>_destruct` | [`DestructFn`] | destroy one plugin instance |
//! | `<library>_plugins` | [`DiscoveryFn`] | null-terminated list of plugin names |
//!
//! Every plugin object starts with a [`PluginObject`] header pointing at a
//! [`PluginVTable`]. The host never looks past that header.
//!
//! Rust authors can implement [`PluginEntry`] and let [`PluginBox`] produce
//! the raw objects:
//!
//! ```
//! use dynplug_abi::{PluginBox, PluginEntry, PluginObject};
//!
//! #[derive(Default)]
//! struct Logger {
//!     started: bool,
//! }
//!
//! impl PluginEntry for Logger {
//!     fn init(&mut self) {
//!         self.started = true;
//!     }
//!
//!     fn fini(&mut self) {
//!         self.started = false;
//!     }
//! }
//!
//! #[unsafe(no_mangle)]
//! pub extern "C" fn logger_construct() -> *mut PluginObject {
//!     PluginBox::into_raw(Logger::default())
//! }
//!
//! #[unsafe(no_mangle)]
//! pub unsafe extern "C" fn logger_destruct(object: *mut PluginObject) {
//!     // SAFETY: the host only passes back pointers produced by `logger_construct`.
//!     unsafe { PluginBox::<Logger>::destroy(object) }
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod entry;
pub mod prelude;
pub mod symbol;
pub mod types;

pub use entry::{PluginBox, PluginEntry};
pub use symbol::{
    CONSTRUCT_SUFFIX, DESTRUCT_SUFFIX, DISCOVERY_SUFFIX, construct_symbol, destruct_symbol,
    discovery_symbol,
};
pub use types::{
    ConstructFn, DestructFn, DiscoveryFn, MAX_DISCOVERED_PLUGINS, PluginNameList, PluginObject,
    PluginVTable,
};
