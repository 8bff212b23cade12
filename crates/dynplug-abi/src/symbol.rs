//! Symbol naming convention shared by hosts and plugin libraries.
//!
//! The convention is fixed; neither side can configure it.

/// Suffix of the per-plugin factory symbol.
pub const CONSTRUCT_SUFFIX: &str = "_construct";

/// Suffix of the per-plugin destructor symbol.
pub const DESTRUCT_SUFFIX: &str = "_destruct";

/// Suffix of the per-library discovery symbol.
pub const DISCOVERY_SUFFIX: &str = "_plugins";

/// Name of the factory symbol for `plugin`.
///
/// ```
/// assert_eq!(dynplug_abi::construct_symbol("logger"), "logger_construct");
/// ```
pub fn construct_symbol(plugin: &str) -> String {
    format!("{plugin}{CONSTRUCT_SUFFIX}")
}

/// Name of the destructor symbol for `plugin`.
///
/// ```
/// assert_eq!(dynplug_abi::destruct_symbol("logger"), "logger_destruct");
/// ```
pub fn destruct_symbol(plugin: &str) -> String {
    format!("{plugin}{DESTRUCT_SUFFIX}")
}

/// Name of the discovery symbol for the library registered as `library`.
///
/// The logical library name is used, not the file name.
///
/// ```
/// assert_eq!(dynplug_abi::discovery_symbol("core"), "core_plugins");
/// ```
pub fn discovery_symbol(library: &str) -> String {
    format!("{library}{DISCOVERY_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixes_are_distinct() {
        assert_ne!(CONSTRUCT_SUFFIX, DESTRUCT_SUFFIX);
        assert_ne!(CONSTRUCT_SUFFIX, DISCOVERY_SUFFIX);
        assert_ne!(DESTRUCT_SUFFIX, DISCOVERY_SUFFIX);
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(construct_symbol(""), "_construct");
        assert_eq!(destruct_symbol(""), "_destruct");
        assert_eq!(discovery_symbol(""), "_plugins");
    }
}
