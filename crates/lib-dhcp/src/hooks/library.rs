use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;
use tracing::{debug, warn};

use crate::hooks::{CalloutFn, HOOK_API_VERSION};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Unable to load hook library {path}: {source}")]
    LibraryLoad {
        path: PathBuf,
        source: libloading::Error,
    },

    #[error("Hook library {path} is missing the mandatory '{symbol}' symbol")]
    MissingSymbol { path: PathBuf, symbol: &'static str },

    #[error("Hook library {path} reports version {got}, host expects {expected}")]
    VersionMismatch {
        path: PathBuf,
        got: u32,
        expected: u32,
    },

    #[error("Hook library {path} load() failed with code {code}")]
    LoadFailed { path: PathBuf, code: i32 },
}

type VersionFn = fn() -> u32;
type LoadFn = fn(&mut LibraryRegistrar) -> i32;
type UnloadFn = fn() -> i32;

/// Passed to a plugin's `load()`: the plugin registers its callouts here
/// and may read its per-library configuration object.
pub struct LibraryRegistrar {
    library_name: String,
    parameters: Option<serde_json::Value>,
    registrations: Vec<(String, CalloutFn)>,
}

impl LibraryRegistrar {
    pub(crate) fn new(library_name: String, parameters: Option<serde_json::Value>) -> Self {
        Self {
            library_name,
            parameters,
            registrations: Vec::new(),
        }
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    pub fn parameters(&self) -> Option<&serde_json::Value> {
        self.parameters.as_ref()
    }

    pub fn register_callout(&mut self, hook: &str, callout: CalloutFn) {
        self.registrations.push((hook.to_string(), callout));
    }

    pub(crate) fn into_registrations(self) -> Vec<(String, CalloutFn)> {
        self.registrations
    }
}

/// One loaded plugin. The shared library stays resident for the lifetime
/// of this value; `unload()` runs on drop.
pub struct HookLibrary {
    path: PathBuf,
    unload: UnloadFn,
    // Dropped last; keeps every symbol of the plugin alive.
    _library: Library,
}

impl HookLibrary {
    /// Load a plugin and run its mandatory entry points: `version()` must
    /// match the host, `load()` receives the registrar.
    pub fn load(
        path: &Path,
        parameters: Option<serde_json::Value>,
        registrar: &mut LibraryRegistrar,
    ) -> Result<Self, HookError> {
        let library = unsafe { Library::new(path) }.map_err(|source| HookError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let version: VersionFn = *lookup(&library, path, "version")?;
        let load: LoadFn = *lookup(&library, path, "load")?;
        let unload: UnloadFn = *lookup(&library, path, "unload")?;

        let got = version();
        if got != HOOK_API_VERSION {
            return Err(HookError::VersionMismatch {
                path: path.to_path_buf(),
                got,
                expected: HOOK_API_VERSION,
            });
        }

        registrar.parameters = parameters;
        let code = load(registrar);
        if code != 0 {
            return Err(HookError::LoadFailed {
                path: path.to_path_buf(),
                code,
            });
        }

        debug!(path = %path.display(), "hook library loaded");
        Ok(Self {
            path: path.to_path_buf(),
            unload,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HookLibrary {
    fn drop(&mut self) {
        let code = (self.unload)();
        if code != 0 {
            warn!(path = %self.path.display(), code, "hook library unload() failed");
        }
    }
}

fn lookup<'l, T>(
    library: &'l Library,
    path: &Path,
    symbol: &'static str,
) -> Result<libloading::Symbol<'l, T>, HookError> {
    unsafe { library.get(symbol.as_bytes()) }.map_err(|_| HookError::MissingSymbol {
        path: path.to_path_buf(),
        symbol,
    })
}
