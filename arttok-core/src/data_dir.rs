use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Typed wrapper for the application data directory.
///
/// Centralizes the on-disk layout so callers use methods instead of
/// ad-hoc `path.join("config.yaml")` etc.
#[derive(Clone, Debug)]
pub struct AppDir {
    path: PathBuf,
}

impl AppDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform data directory + `arttok`, falling back to the current
    /// directory when the platform offers none.
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("arttok"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join("config.yaml")
    }
}

impl Deref for AppDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for AppDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for AppDir {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}
