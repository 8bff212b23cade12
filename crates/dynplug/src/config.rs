//! Configuration for mapping native images.

use serde::{Deserialize, Serialize};

/// When the loader binds the functions a library references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolBinding {
    /// Bind functions on first call (`RTLD_LAZY`).
    #[default]
    Lazy,
    /// Bind everything while opening (`RTLD_NOW`). A library with unresolved
    /// dependencies fails to open instead of failing on first call.
    Now,
}

/// Whether a library's exports are visible to libraries opened after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolScope {
    /// Exports are only reachable through the handle (`RTLD_LOCAL`).
    #[default]
    Local,
    /// Exports join the global namespace (`RTLD_GLOBAL`).
    Global,
}

/// How libraries are opened.
///
/// | Preset | `binding` | `scope` |
/// |--------|-----------|---------|
/// | [`LoadConfig::lazy`] (default) | `lazy` | `local` |
/// | [`LoadConfig::eager`] | `now` | `local` |
///
/// Both settings only take effect on Unix; other platforms ignore them.
///
/// ```
/// use dynplug::config::{LoadConfig, SymbolBinding, SymbolScope};
///
/// let config: LoadConfig = serde_json::from_str(r#"{ "binding": "now" }"#)?;
/// assert_eq!(config.binding, SymbolBinding::Now);
/// assert_eq!(config.scope, SymbolScope::Local);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Function binding mode.
    pub binding: SymbolBinding,
    /// Export visibility.
    pub scope: SymbolScope,
}

impl LoadConfig {
    /// Lazy binding, local scope.
    pub fn lazy() -> Self {
        Self {
            binding: SymbolBinding::Lazy,
            scope: SymbolScope::Local,
        }
    }

    /// Immediate binding, local scope.
    pub fn eager() -> Self {
        Self {
            binding: SymbolBinding::Now,
            scope: SymbolScope::Local,
        }
    }

    /// Same configuration with exports made globally visible.
    pub fn with_global_scope(mut self) -> Self {
        self.scope = SymbolScope::Global;
        self
    }

    /// `dlopen` flags for this configuration.
    #[cfg(unix)]
    pub(crate) fn dlopen_flags(&self) -> std::os::raw::c_int {
        use libloading::os::unix::{RTLD_GLOBAL, RTLD_LAZY, RTLD_LOCAL, RTLD_NOW};

        let binding = match self.binding {
            SymbolBinding::Lazy => RTLD_LAZY,
            SymbolBinding::Now => RTLD_NOW,
        };
        let scope = match self.scope {
            SymbolScope::Local => RTLD_LOCAL,
            SymbolScope::Global => RTLD_GLOBAL,
        };
        binding | scope
    }
}
