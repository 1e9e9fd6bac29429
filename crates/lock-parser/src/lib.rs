//! # lock-parser
//!
//! Parse and validate Terraform dependency lock files (`.terraform.lock.hcl`).
//!
//! ## Overview
//!
//! A lock file is a sequence of `provider` blocks written in a subset of HCL:
//!
//! ```hcl
//! provider "registry.terraform.io/hashicorp/aws" {
//!   version     = "5.31.0"
//!   constraints = ">= 4.0.0"
//!   hashes = [
//!     "h1:...",
//!   ]
//! }
//! ```
//!
//! Parsing happens in two stages:
//! - **syntax**: source text to a [`syntax::Body`] tree, with byte spans
//! - **extraction**: `provider` blocks to [`ProviderRecord`]s, looked up by
//!   attribute name so that ordering and formatting do not matter
//!
//! Anything other than `provider` blocks (and unknown attributes inside them)
//! is accepted and ignored.
//!
//! ## Example
//!
//! ```
//! use lock_parser::{ErrorKind, LockFile};
//!
//! let lock_file = LockFile::parse(br#"
//! provider "example.com/provider" {
//!   version = "1.0.0"
//!   hashes  = ["h1:abc", "zh:def"]
//! }
//! "#).unwrap();
//! assert_eq!(lock_file.get("example.com/provider").unwrap().hashes.len(), 2);
//!
//! let err = LockFile::parse(br#"provider "x" { version = "1.0.0" }"#).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::MissingField);
//! ```
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `parse()` | O(n) in input size |
//! | `get(name)` | O(log p) |
//! | `iter()` | O(p) |

mod error;
mod lexer;
mod lockfile;
mod parser;
pub mod span;
pub mod syntax;

pub use error::{ErrorKind, LockFileError};
pub use lockfile::{LockFile, ProviderRecord};
pub use span::Position;

/// Default base name of a lock file.
pub const LOCK_FILE_NAME: &str = ".terraform.lock.hcl";

/// Parse source text into a syntax tree without extracting providers.
///
/// Useful for tooling that needs the blocks a lock file carries besides
/// `provider`.
pub fn parse_syntax(text: &[u8]) -> Result<syntax::Body, LockFileError> {
    let source = lockfile::decode(text)?;
    let index = span::LineIndex::new(source);
    parser::parse_source(source).map_err(|e| e.locate(&index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_syntax_exposes_other_blocks() {
        let body = parse_syntax(b"terraform {\n  required_version = \">= 1.5\"\n}\n").unwrap();
        let terraform = body.blocks("terraform").next().unwrap();
        assert_eq!(
            terraform
                .body
                .attribute("required_version")
                .and_then(|a| a.value.node.as_literal()),
            Some(">= 1.5")
        );
    }

    #[test]
    fn test_parse_syntax_error_is_located() {
        let err = parse_syntax(b"a = 1\nb = \n").unwrap_err();
        let LockFileError::Syntax { position, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(position.line, 3);
    }
}
