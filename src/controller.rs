mod batch;

pub use batch::{parse_all, BatchError, BatchOptions, BatchOutcome};
