use std::path::PathBuf;

use futures::{stream, StreamExt};
use lock_parser::LockFile;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ErrorPolicy;
use crate::entity::FileFailure;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Maximum number of files read and parsed at once
    pub concurrency: usize,
    pub error_policy: ErrorPolicy,
}

/// Every file's result, in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub parsed: Vec<(PathBuf, LockFile)>,
    /// Always empty under [`ErrorPolicy::Abort`]
    pub failures: Vec<FileFailure>,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Failed(#[from] FileFailure),
    #[error("parse worker failed: {0}")]
    Worker(#[from] JoinError),
    #[error("cancelled after {completed} of {total} files")]
    Cancelled { completed: usize, total: usize },
}

/// Read and parse every path on the blocking pool.
///
/// Results are consumed in input order regardless of which parse finishes
/// first. Under [`ErrorPolicy::Abort`] the first failure in that order ends the
/// batch: no further files are scheduled, and reads already on the blocking
/// pool finish with their results discarded. Cancelling `token` ends the batch
/// the same way with [`BatchError::Cancelled`].
pub async fn parse_all(
    paths: Vec<PathBuf>,
    options: BatchOptions,
    token: &CancellationToken,
) -> Result<BatchOutcome, BatchError> {
    let total = paths.len();
    let mut results = stream::iter(paths)
        .map(|path| {
            tokio::task::spawn_blocking(move || {
                let result = LockFile::from_path(&path);
                (path, result)
            })
        })
        .buffered(options.concurrency.max(1));

    let mut outcome = BatchOutcome::default();
    let mut completed = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(completed, total, "batch cancelled");
                return Err(BatchError::Cancelled { completed, total });
            }
            next = results.next() => next,
        };
        let Some(joined) = next else {
            break;
        };
        let (path, result) = joined?;
        completed += 1;

        match result {
            Ok(lock_file) => {
                debug!(path = %path.display(), providers = lock_file.len(), "parsed");
                outcome.parsed.push((path, lock_file));
            }
            Err(source) => {
                let failure = FileFailure::new(path, source);
                match options.error_policy {
                    ErrorPolicy::Abort => return Err(failure.into()),
                    ErrorPolicy::Continue => {
                        debug!(kind = ?failure.kind(), "{failure}");
                        outcome.failures.push(failure);
                    }
                }
            }
        }
    }

    debug!(
        parsed = outcome.parsed.len(),
        failed = outcome.failures.len(),
        "batch finished"
    );
    Ok(outcome)
}
