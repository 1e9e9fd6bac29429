use std::path::PathBuf;

use lock_parser::{ErrorKind, LockFileError};
use thiserror::Error;

/// A lock file that could not be read or parsed.
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct FileFailure {
    pub path: PathBuf,
    #[source]
    pub source: LockFileError,
}

impl FileFailure {
    pub fn new(path: PathBuf, source: LockFileError) -> Self {
        Self { path, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_path() {
        let failure = FileFailure::new(PathBuf::from("a/.terraform.lock.hcl"), LockFileError::Empty);
        assert_eq!(failure.to_string(), "a/.terraform.lock.hcl: lock file is empty");
        assert_eq!(failure.kind(), ErrorKind::Structural);
    }
}
