//! Provider extraction from a parsed lock file.

use std::collections::btree_map::{self, Entry};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::LockFileError;
use crate::parser::parse_source;
use crate::span::{LineIndex, Span};
use crate::syntax::{Attribute, Block, Body, Label};

const PROVIDER_BLOCK: &str = "provider";

/// One `provider` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    /// Provider source address, e.g. `registry.terraform.io/hashicorp/aws`
    pub name: String,
    /// Exact pinned version
    pub version: String,
    /// Version constraints; empty when the block has none
    pub constraints: String,
    /// Hashes in source order, never empty
    pub hashes: Vec<String>,
}

/// A parsed lock file: provider name to record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
    providers: BTreeMap<String, ProviderRecord>,
}

impl LockFile {
    /// Parse the raw contents of a lock file.
    ///
    /// Fails on the first problem found; there is no partial result.
    ///
    /// # Example
    ///
    /// ```
    /// use lock_parser::LockFile;
    ///
    /// let lock_file = LockFile::parse(br#"
    /// provider "registry.terraform.io/hashicorp/null" {
    ///   version = "3.2.1"
    ///   hashes  = ["h1:abc"]
    /// }
    /// "#).unwrap();
    ///
    /// let record = lock_file.get("registry.terraform.io/hashicorp/null").unwrap();
    /// assert_eq!(record.version, "3.2.1");
    /// assert_eq!(record.constraints, "");
    /// ```
    pub fn parse(text: &[u8]) -> Result<Self, LockFileError> {
        let source = decode(text)?;
        let index = LineIndex::new(source);
        let body = parse_source(source).map_err(|e| e.locate(&index))?;
        if body.is_empty() {
            return Err(LockFileError::Empty);
        }

        let lock_file = Self::from_body(&body, &index)?;
        debug!(providers = lock_file.len(), "parsed lock file");
        Ok(lock_file)
    }

    /// Read and parse the lock file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LockFileError> {
        let contents = std::fs::read(path.as_ref())?;
        Self::parse(&contents)
    }

    fn from_body(body: &Body, index: &LineIndex<'_>) -> Result<Self, LockFileError> {
        let mut providers = BTreeMap::new();
        let mut first_lines = HashMap::new();

        for block in body.blocks(PROVIDER_BLOCK) {
            let record = ProviderRecord::from_block(block, index)?;
            let line = index.line(block.span.start);
            trace!(provider = %record.name, line, "provider block");
            match providers.entry(record.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(LockFileError::DuplicateProvider {
                        first_line: first_lines.get(&record.name).copied().unwrap_or(line),
                        name: record.name,
                        line,
                    });
                }
                Entry::Vacant(slot) => {
                    first_lines.insert(record.name.clone(), line);
                    slot.insert(record);
                }
            }
        }

        Ok(Self { providers })
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<&ProviderRecord> {
        self.providers.get(name)
    }

    /// Records ordered by provider name.
    pub fn iter(&self) -> btree_map::Values<'_, String, ProviderRecord> {
        self.providers.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<'a> IntoIterator for &'a LockFile {
    type Item = &'a ProviderRecord;
    type IntoIter = btree_map::Values<'a, String, ProviderRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl ProviderRecord {
    fn from_block(block: &Block, index: &LineIndex<'_>) -> Result<Self, LockFileError> {
        let name = provider_name(block, index)?;
        let fields = Fields {
            provider: &name,
            body: &block.body,
            index,
        };

        let version = fields.required_literal("version")?;
        if version.is_empty() {
            let attr = fields.attribute("version")?;
            return Err(fields.structure(attr.value.span, "`version` is empty"));
        }
        let constraints = match block.body.attribute("constraints") {
            Some(attr) => fields.literal(attr)?.to_string(),
            None => String::new(),
        };
        let hashes = fields.hashes()?;

        Ok(Self {
            version: version.to_string(),
            constraints,
            hashes,
            name,
        })
    }
}

fn provider_name(block: &Block, index: &LineIndex<'_>) -> Result<String, LockFileError> {
    let structure = |span: Span, message: String| LockFileError::Structure {
        provider: None,
        position: index.position(span.start),
        message,
    };

    match block.labels.as_slice() {
        [label] => match &label.node {
            Label::Literal(name) if name.is_empty() => {
                Err(structure(label.span, "provider name is empty".to_string()))
            }
            Label::Literal(name) => Ok(name.clone()),
            Label::Template(_) => Err(structure(
                label.span,
                "provider name must be a string literal, found a string template".to_string(),
            )),
            Label::Bare(ident) => Err(structure(
                label.span,
                format!("provider name must be a double-quoted string, found identifier `{ident}`"),
            )),
        },
        [] => Err(structure(
            block.kind.span,
            "provider block has no name label".to_string(),
        )),
        [_, extra, ..] => Err(structure(
            extra.span,
            format!(
                "provider block takes exactly one label, found {}",
                block.labels.len()
            ),
        )),
    }
}

/// Attribute access within one provider block, with errors that name the provider.
struct Fields<'a> {
    provider: &'a str,
    body: &'a Body,
    index: &'a LineIndex<'a>,
}

impl<'a> Fields<'a> {
    fn structure(&self, span: Span, message: impl Into<String>) -> LockFileError {
        LockFileError::Structure {
            provider: Some(self.provider.to_string()),
            position: self.index.position(span.start),
            message: message.into(),
        }
    }

    fn attribute(&self, field: &'static str) -> Result<&'a Attribute, LockFileError> {
        self.body
            .attribute(field)
            .ok_or_else(|| LockFileError::MissingField {
                provider: self.provider.to_string(),
                field,
            })
    }

    fn literal(&self, attr: &'a Attribute) -> Result<&'a str, LockFileError> {
        attr.value.node.as_literal().ok_or_else(|| {
            self.structure(
                attr.value.span,
                format!(
                    "`{}` must be a string literal, found {}",
                    attr.key.node,
                    attr.value.node.describe()
                ),
            )
        })
    }

    fn required_literal(&self, field: &'static str) -> Result<&'a str, LockFileError> {
        let attr = self.attribute(field)?;
        self.literal(attr)
    }

    fn hashes(&self) -> Result<Vec<String>, LockFileError> {
        let attr = self.attribute("hashes")?;
        let Some(elements) = attr.value.node.as_tuple() else {
            return Err(self.structure(
                attr.value.span,
                format!(
                    "`hashes` must be a list of strings, found {}",
                    attr.value.node.describe()
                ),
            ));
        };
        if elements.is_empty() {
            return Err(self.structure(attr.value.span, "`hashes` list is empty"));
        }

        elements
            .iter()
            .map(|element| {
                element
                    .node
                    .as_literal()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        self.structure(
                            element.span,
                            format!(
                                "`hashes` entries must be string literals, found {}",
                                element.node.describe()
                            ),
                        )
                    })
            })
            .collect()
    }
}

/// Validate UTF-8, pointing at the first bad byte. A leading byte order mark is dropped.
pub(crate) fn decode(text: &[u8]) -> Result<&str, LockFileError> {
    match std::str::from_utf8(text) {
        Ok(source) => Ok(source.strip_prefix('\u{feff}').unwrap_or(source)),
        Err(e) => {
            let valid = std::str::from_utf8(&text[..e.valid_up_to()]).unwrap_or_default();
            Err(LockFileError::Syntax {
                position: LineIndex::new(valid).position(valid.len()),
                message: "input is not valid UTF-8".to_string(),
            })
        }
    }
}
