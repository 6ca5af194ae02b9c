//! Error kinds surfaced by the pipeline and the accumulated error set.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidSourceId,
    DatabaseError,
    MapperError,
    InvalidResponseId,
    TransformResponseError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSourceId => "INVALID_SOURCE_ID",
            ErrorKind::DatabaseError => "DATABASE_ERROR",
            ErrorKind::MapperError => "MAPPER_ERROR",
            ErrorKind::InvalidResponseId => "INVALID_RESPONSE_ID",
            ErrorKind::TransformResponseError => "TRANSFORM_RESPONSE_ERROR",
        }
    }

    /// Fatal kinds end the request with a 400 and no delivered results.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidSourceId | ErrorKind::DatabaseError | ErrorKind::MapperError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors keyed by kind.
///
/// Merging never replaces an entry that is already present, so a set only
/// ever grows as it moves through the pipeline. Kinds reported by a mapper
/// are free-form strings and share the key space with [`ErrorKind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorSet(BTreeMap<String, Value>);

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new set holding `self` plus `kind`, unless `kind` is
    /// already recorded.
    pub fn with(&self, kind: impl Into<String>, detail: Value) -> Self {
        let mut merged = self.0.clone();
        merged.entry(kind.into()).or_insert(detail);
        Self(merged)
    }

    /// Shorthand for [`ErrorSet::with`] on a pipeline error kind.
    pub fn with_kind(&self, kind: ErrorKind, detail: Value) -> Self {
        self.with(kind.as_str(), detail)
    }

    /// Union of both sets. Entries of `self` win on key collisions.
    pub fn merge(&self, other: &ErrorSet) -> Self {
        let mut merged = self.0.clone();
        for (kind, detail) in &other.0 {
            merged
                .entry(kind.clone())
                .or_insert_with(|| detail.clone());
        }
        Self(merged)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.contains_key(kind)
    }

    pub fn get(&self, kind: &str) -> Option<&Value> {
        self.0.get(kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ErrorSet::new(), |set, (kind, detail)| set.with(kind, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_keeps_first_detail() {
        let set = ErrorSet::new()
            .with("A", json!("first"))
            .with("A", json!("second"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("A"), Some(&json!("first")));
    }

    #[test]
    fn test_with_does_not_touch_base() {
        let base = ErrorSet::new().with("A", json!(1));
        let extended = base.with_kind(ErrorKind::InvalidResponseId, json!("boom"));
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert!(extended.contains("INVALID_RESPONSE_ID"));
    }

    #[test]
    fn test_merge_prefers_base() {
        let base = ErrorSet::new().with("A", json!(1)).with("B", json!(2));
        let other = ErrorSet::new().with("B", json!(20)).with("C", json!(30));
        let merged = base.merge(&other);
        assert_eq!(merged.kinds().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(merged.get("B"), Some(&json!(2)));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let set = ErrorSet::new().with_kind(ErrorKind::TransformResponseError, json!("bad"));
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({ "TRANSFORM_RESPONSE_ERROR": "bad" })
        );
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(ErrorKind::InvalidSourceId.is_fatal());
        assert!(ErrorKind::DatabaseError.is_fatal());
        assert!(ErrorKind::MapperError.is_fatal());
        assert!(!ErrorKind::InvalidResponseId.is_fatal());
        assert!(!ErrorKind::TransformResponseError.is_fatal());
    }
}
