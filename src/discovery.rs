//! Finding lock files under a root directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

use lock_parser::LOCK_FILE_NAME;

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Base name a file must have to be picked up
    pub lock_file_name: String,
    /// Directory names to skip entirely
    pub exclude: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            lock_file_name: LOCK_FILE_NAME.to_string(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("root directory {0} does not exist")]
    RootNotFound(PathBuf),
    #[error("root {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to inspect root {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Collect every lock file under `root`, in file-name-sorted walk order.
///
/// Symlinks are not followed. Any traversal error fails the whole discovery.
pub fn discover(root: &Path, options: &DiscoveryOptions) -> Result<Vec<PathBuf>, DiscoveryError> {
    let metadata = std::fs::metadata(root).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => DiscoveryError::RootNotFound(root.to_path_buf()),
        _ => DiscoveryError::Root {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    let mut found = Vec::new();

    for entry in walker.into_iter().filter_entry(|e| {
        // never prune the root itself
        e.depth() == 0
            || !e.file_type().is_dir()
            || !options
                .exclude
                .iter()
                .any(|name| e.file_name().to_str() == Some(name.as_str()))
    }) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_str() == Some(options.lock_file_name.as_str()) {
            trace!(path = %entry.path().display(), "found lock file");
            found.push(entry.into_path());
        }
    }

    debug!(root = %root.display(), count = found.len(), "discovered lock files");
    Ok(found)
}
