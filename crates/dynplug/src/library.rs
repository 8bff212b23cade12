//! Shared-ownership handle to one mapped native image.
//!
//! A [`LibraryHandle`] is a cheap, clonable reference to an opened library.
//! Every [`Function`] resolved from it holds another reference, so the image
//! stays mapped until the repository entry and every resolved function (and
//! every plugin built from one) have been dropped.
//!
//! # Security Considerations
//!
//! Opening a library runs its initialisers with full process privileges.
//! Loaded code is not sandboxed.

use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

use crate::config::LoadConfig;
use crate::error::{PluginError, Result};
use crate::lifecycle::{LifecycleEvent, SharedObserver, default_observer};

struct LibraryInner {
    library: Option<Library>,
    path: PathBuf,
    config: LoadConfig,
    observer: SharedObserver,
}

impl Drop for LibraryInner {
    fn drop(&mut self) {
        if let Some(library) = self.library.take() {
            if let Err(e) = library.close() {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to unmap library");
            }
            self.observer.on_event(&LifecycleEvent::LibraryClosed { path: &self.path });
        }
    }
}

/// Handle to an opened native library.
///
/// Clones share the same image. Equality is identity: two handles are equal
/// when they refer to the same open call.
#[derive(Clone)]
pub struct LibraryHandle {
    inner: Arc<LibraryInner>,
}

impl LibraryHandle {
    /// Open the library at `path` with the default [`LoadConfig`] and the
    /// default tracing observer.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] if the image cannot be mapped: missing
    /// file, wrong architecture, or unresolved dependencies.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &LoadConfig::default(), default_observer())
    }

    /// Open the library at `path` with an explicit configuration and observer.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] if the image cannot be mapped.
    pub fn open_with(
        path: impl AsRef<Path>,
        config: &LoadConfig,
        observer: SharedObserver,
    ) -> Result<Self> {
        let path = path.as_ref();
        let library = open_image(path, config).map_err(|source| PluginError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            binding = ?config.binding,
            scope = ?config.scope,
            "Library loaded"
        );
        observer.on_event(&LifecycleEvent::LibraryOpened { path });

        Ok(Self {
            inner: Arc::new(LibraryInner {
                library: Some(library),
                path: path.to_path_buf(),
                config: *config,
                observer,
            }),
        })
    }

    /// Resolve the exported symbol `name` as a value of type `F`.
    ///
    /// `F` is normally an `unsafe extern "C" fn(..) -> ..` pointer type. The
    /// returned [`Function`] keeps this library mapped while it is alive.
    ///
    /// # Safety
    ///
    /// `F` must match the real type of the export exactly. The native symbol
    /// carries no type information, so a mismatch cannot be detected and is
    /// undefined behaviour once the function is called.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Symbol`] if the export is missing, the name is
    /// not a valid C string, or the library is not open.
    pub unsafe fn resolve<F: Copy>(&self, name: &str) -> Result<Function<F>> {
        let library = self
            .inner
            .library
            .as_ref()
            .ok_or_else(|| self.symbol_error(name, "library is not open"))?;

        // SAFETY: the caller guarantees that `F` matches the export.
        let symbol = unsafe { library.get::<F>(name.as_bytes()) }
            .map_err(|e| self.symbol_error(name, e.to_string()))?;
        let func = *symbol;

        tracing::debug!(path = %self.inner.path.display(), symbol = name, "Symbol resolved");

        Ok(Function {
            func,
            symbol: name.to_string(),
            library: self.clone(),
        })
    }

    /// Release this holder and unmap the image if it was the last one.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LibraryInUse`] if other holders remain; the
    /// caller's reference is released either way and the image stays mapped
    /// for the others. Returns [`PluginError::Close`] if the native unmap
    /// fails.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                let Some(library) = inner.library.take() else {
                    return Ok(());
                };
                let result = library.close();
                inner
                    .observer
                    .on_event(&LifecycleEvent::LibraryClosed { path: &inner.path });
                tracing::debug!(path = %inner.path.display(), "Library closed");
                result.map_err(|source| PluginError::Close {
                    path: inner.path.clone(),
                    source,
                })
            }
            Err(inner) => {
                let holders = Arc::strong_count(&inner).saturating_sub(1);
                let path = inner.path.clone();
                drop(inner);
                Err(PluginError::LibraryInUse { path, holders })
            }
        }
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Configuration the library was opened with.
    pub fn config(&self) -> &LoadConfig {
        &self.inner.config
    }

    /// Whether the image is still mapped.
    pub fn is_open(&self) -> bool {
        self.inner.library.is_some()
    }

    /// Number of live holders, this handle included.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub(crate) fn observer(&self) -> &SharedObserver {
        &self.inner.observer
    }

    fn symbol_error(&self, symbol: &str, reason: impl Into<String>) -> PluginError {
        PluginError::Symbol {
            symbol: symbol.to_string(),
            library: self.inner.path.clone(),
            reason: reason.into(),
        }
    }
}

impl PartialEq for LibraryHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for LibraryHandle {}

impl fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("path", &self.inner.path)
            .field("open", &self.is_open())
            .field("holders", &self.holders())
            .finish()
    }
}

#[cfg(unix)]
fn open_image(path: &Path, config: &LoadConfig) -> std::result::Result<Library, libloading::Error> {
    // SAFETY: opening runs the library's initialisers; hosts only load
    // libraries they trust.
    let library = unsafe { libloading::os::unix::Library::open(Some(path), config.dlopen_flags()) }?;
    Ok(library.into())
}

#[cfg(not(unix))]
fn open_image(path: &Path, config: &LoadConfig) -> std::result::Result<Library, libloading::Error> {
    if *config != LoadConfig::default() {
        tracing::debug!(?config, "Load configuration ignored on this platform");
    }
    // SAFETY: opening runs the library's initialisers; hosts only load
    // libraries they trust.
    unsafe { Library::new(path) }
}

/// Function resolved from a [`LibraryHandle`].
///
/// Dereferences to the raw function pointer. Calls made through the
/// `Function` are guaranteed to find the library mapped; a pointer copied
/// out of it carries no such guarantee.
pub struct Function<F> {
    func: F,
    symbol: String,
    library: LibraryHandle,
}

impl<F: Copy> Function<F> {
    /// Name of the resolved symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Library this function keeps mapped.
    pub fn library(&self) -> &LibraryHandle {
        &self.library
    }
}

impl<F> Deref for Function<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.func
    }
}

impl<F: Copy> Clone for Function<F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func,
            symbol: self.symbol.clone(),
            library: self.library.clone(),
        }
    }
}

impl<F> fmt::Debug for Function<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("symbol", &self.symbol)
            .field("library", &self.library.path())
            .finish()
    }
}
