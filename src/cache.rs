//! Index of driver binaries already present in the local cache tree.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::WebDriverError;
use crate::platform::{Architecture, OperatingSystem};

/// Snapshot of the files under the cache root.
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl CacheIndex {
    /// Collects every regular file below `root`. A missing root yields an empty index.
    ///
    /// Entries are sorted by file name so that the "last match wins" tie-break in
    /// [`CacheIndex::find`] does not depend on filesystem enumeration order.
    pub fn scan(root: &Path) -> Self {
        let files = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        Self {
            root: root.to_path_buf(),
            files,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Looks up a cached driver by name, version, OS and architecture.
    ///
    /// Matching is done on the lowercase path relative to the cache root. Filters run in
    /// that order; the OS filter is skipped for OS-agnostic drivers. A single
    /// survivor after the OS filter is returned directly, otherwise the architecture decides
    /// and the last remaining file wins.
    pub fn find(
        &self,
        driver_name: &str,
        version: &str,
        os: OperatingSystem,
        arch: Architecture,
        os_agnostic: bool,
    ) -> Option<PathBuf> {
        trace!("Checking if {} {} exists in cache", driver_name, version);
        if self.files.is_empty() {
            return None;
        }

        let mut files = self.filter_by(&self.files, driver_name);
        files = self.filter_by(&files, version);
        if !os_agnostic {
            files = self.filter_by(&files, os.token());
        }
        if files.len() == 1 {
            return files.pop();
        }

        files = self.filter_by(&files, arch.token());
        let found = files.pop();
        match &found {
            Some(path) => debug!("Found {} in cache at {}", driver_name, path.display()),
            None => trace!("{} {} not found in cache", driver_name, version),
        }
        found
    }

    fn filter_by(&self, files: &[PathBuf], key: &str) -> Vec<PathBuf> {
        if key.is_empty() {
            return files.to_vec();
        }
        let key = key.to_ascii_lowercase();
        files
            .iter()
            .filter(|f| {
                let relative = f.strip_prefix(&self.root).unwrap_or(f.as_path());
                relative.to_string_lossy().to_ascii_lowercase().contains(&key)
            })
            .cloned()
            .collect()
    }
}

/// Deletes the whole cache tree.
pub fn clear(root: &Path) -> Result<(), WebDriverError> {
    if !root.exists() {
        return Ok(());
    }
    debug!("Clearing driver cache at {}", root.display());
    std::fs::remove_dir_all(root).map_err(|e| WebDriverError::io(root, e))
}
