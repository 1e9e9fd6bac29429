//! # insights
//!
//! Aggregate parsed lock files into a provider → version → files report.
//!
//! ## Example
//!
//! ```
//! use insights::{InsightsReport, JsonStyle};
//! use lock_parser::LockFile;
//!
//! let lock_file = LockFile::parse(br#"
//! provider "example.com/provider" {
//!   version = "foo"
//!   hashes  = ["cat"]
//! }
//! "#).unwrap();
//!
//! let report = InsightsReport::aggregate([("infra/.terraform.lock.hcl", &lock_file)]);
//! assert_eq!(
//!     report.render(JsonStyle::Compact).unwrap(),
//!     r#"{"example.com/provider":{"foo":["infra/.terraform.lock.hcl"]}}"#
//! );
//! ```

mod error;
mod report;

pub use error::InsightsError;
pub use report::{InsightsReport, JsonStyle, Versions};
