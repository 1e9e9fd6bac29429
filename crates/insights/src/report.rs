//! InsightsReport: which files pin which version of each provider.

use std::collections::{btree_map, BTreeMap};
use std::path::Path;

use lock_parser::LockFile;
use serde::Serialize;
use tracing::debug;

use crate::error::InsightsError;

/// Version to the files pinning it, in aggregation order.
pub type Versions = BTreeMap<String, Vec<String>>;

/// Output formatting for [`InsightsReport::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonStyle {
    #[default]
    Compact,
    /// Two-space indentation
    Pretty,
}

/// Provider name to version to file paths.
///
/// Serializes as a plain nested object: `{"<provider>": {"<version>": ["<path>", ...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InsightsReport {
    providers: BTreeMap<String, Versions>,
}

impl InsightsReport {
    /// Fold lock files into a report.
    ///
    /// Paths are appended in iteration order, so within each (provider, version)
    /// bucket they keep the order the files were supplied in.
    pub fn aggregate<'a, I, P>(lock_files: I) -> Self
    where
        I: IntoIterator<Item = (P, &'a LockFile)>,
        P: AsRef<Path>,
    {
        let mut providers: BTreeMap<String, Versions> = BTreeMap::new();
        let mut files = 0usize;

        for (path, lock_file) in lock_files {
            let path = path.as_ref().display().to_string();
            for record in lock_file {
                providers
                    .entry(record.name.clone())
                    .or_default()
                    .entry(record.version.clone())
                    .or_default()
                    .push(path.clone());
            }
            files += 1;
        }

        debug!(files, providers = providers.len(), "aggregated lock files");
        Self { providers }
    }

    /// Versions pinned for a provider.
    pub fn get(&self, name: &str) -> Option<&Versions> {
        self.providers.get(name)
    }

    /// Files pinning `name` at exactly `version`.
    pub fn files(&self, name: &str, version: &str) -> Option<&[String]> {
        self.get(name)?.get(version).map(Vec::as_slice)
    }

    /// Iterate providers in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Versions> {
        self.providers.iter()
    }

    /// Number of distinct providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers pinned at more than one version across the aggregated files.
    pub fn divergent(&self) -> impl Iterator<Item = (&str, &Versions)> {
        self.providers
            .iter()
            .filter(|(_, versions)| versions.len() > 1)
            .map(|(name, versions)| (name.as_str(), versions))
    }

    pub fn render(&self, style: JsonStyle) -> Result<String, InsightsError> {
        let json = match style {
            JsonStyle::Compact => serde_json::to_string(self)?,
            JsonStyle::Pretty => serde_json::to_string_pretty(self)?,
        };
        Ok(json)
    }
}

impl<'a> IntoIterator for &'a InsightsReport {
    type Item = (&'a String, &'a Versions);
    type IntoIter = btree_map::Iter<'a, String, Versions>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lock_file(providers: &[(&str, &str)]) -> LockFile {
        let source: String = providers
            .iter()
            .map(|(name, version)| {
                format!("provider \"{name}\" {{\n  version = \"{version}\"\n  hashes = [\"h1:x\"]\n}}\n")
            })
            .collect();
        LockFile::parse(source.as_bytes()).unwrap()
    }

    #[test]
    fn test_empty_report() {
        let report = InsightsReport::aggregate(Vec::<(PathBuf, &LockFile)>::new());
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.render(JsonStyle::Compact).unwrap(), "{}");
    }

    #[test]
    fn test_single_file() {
        let file = lock_file(&[("example.com/provider", "foo")]);
        let report = InsightsReport::aggregate([("/some/path", &file)]);

        assert_eq!(
            report.render(JsonStyle::Compact).unwrap(),
            r#"{"example.com/provider":{"foo":["/some/path"]}}"#
        );
        assert_eq!(
            report.files("example.com/provider", "foo"),
            Some(&["/some/path".to_string()][..])
        );
        assert_eq!(report.files("example.com/provider", "bar"), None);
        assert_eq!(report.files("missing", "foo"), None);
    }

    #[test]
    fn test_same_version_keeps_processing_order() {
        let first = lock_file(&[("example.com/provider", "foo")]);
        let second = lock_file(&[("example.com/provider", "foo")]);
        let report = InsightsReport::aggregate([("/z/path", &first), ("/a/path", &second)]);

        assert_eq!(
            report.render(JsonStyle::Compact).unwrap(),
            r#"{"example.com/provider":{"foo":["/z/path","/a/path"]}}"#
        );
    }

    #[test]
    fn test_mixed_versions_and_providers() {
        let one = lock_file(&[("example.com/provider", "foo"), ("example.com/other", "1.0")]);
        let two = lock_file(&[("example.com/provider", "bar")]);
        let three = lock_file(&[("example.com/provider", "foo")]);
        let report = InsightsReport::aggregate(vec![
            (PathBuf::from("one"), &one),
            (PathBuf::from("two"), &two),
            (PathBuf::from("three"), &three),
        ]);

        assert_eq!(report.len(), 2);
        let versions = report.get("example.com/provider").unwrap();
        assert_eq!(versions["foo"], vec!["one", "three"]);
        assert_eq!(versions["bar"], vec!["two"]);
        assert_eq!(report.get("example.com/other").unwrap()["1.0"], vec!["one"]);

        let names: Vec<_> = report.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["example.com/other", "example.com/provider"]);
    }

    #[test]
    fn test_divergent() {
        let one = lock_file(&[("a", "1"), ("b", "1")]);
        let two = lock_file(&[("a", "2"), ("b", "1")]);
        let report = InsightsReport::aggregate([("one", &one), ("two", &two)]);

        let divergent: Vec<_> = report.divergent().map(|(name, _)| name).collect();
        assert_eq!(divergent, vec!["a"]);
    }

    #[test]
    fn test_render_pretty() {
        let file = lock_file(&[("p", "1")]);
        let report = InsightsReport::aggregate([("f", &file)]);
        assert_eq!(
            report.render(JsonStyle::Pretty).unwrap(),
            "{\n  \"p\": {\n    \"1\": [\n      \"f\"\n    ]\n  }\n}"
        );
    }
}
