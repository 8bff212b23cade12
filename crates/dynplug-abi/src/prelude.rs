//! Convenience re-exports for plugin authors.

pub use crate::entry::{PluginBox, PluginEntry};
pub use crate::symbol::{construct_symbol, destruct_symbol, discovery_symbol};
pub use crate::types::{
    ConstructFn, DestructFn, DiscoveryFn, PluginNameList, PluginObject, PluginVTable,
};
