//! Emission context threaded through one record's generation pass.
//!
//! The only cross-cutting state is the set of support libraries the generated
//! code must import. It is monotone: entries are added, never removed.
use std::collections::BTreeSet;

use serde::Serialize;

/// Buffer variable the encode procedure writes into.
pub const DEFAULT_BUFFER: &str = "buf";
/// Receiver variable of the generated methods.
pub const DEFAULT_RECORD: &str = "msg";

/// A Go package the generated code references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Bytes,
    Base64,
    Json,
    Strconv,
    Sort,
    Protojson,
}

impl Support {
    pub fn import_path(self) -> &'static str {
        match self {
            Support::Bytes => "bytes",
            Support::Base64 => "encoding/base64",
            Support::Json => "encoding/json",
            Support::Strconv => "strconv",
            Support::Sort => "sort",
            Support::Protojson => "google.golang.org/protobuf/encoding/protojson",
        }
    }

    pub fn is_std(self) -> bool {
        !matches!(self, Support::Protojson)
    }
}

/// Deduplicated, ordered set of support libraries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupportSet(BTreeSet<Support>);

impl SupportSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, support: Support) {
        self.0.insert(support);
    }

    pub fn merge(&mut self, other: &SupportSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn contains(&self, support: Support) -> bool {
        self.0.contains(&support)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Sorted by import path, the order gofmt keeps within a group.
    pub fn import_paths(&self) -> Vec<&'static str> {
        let mut paths: Vec<_> = self.0.iter().map(|s| s.import_path()).collect();
        paths.sort_unstable();
        paths
    }

    pub fn iter(&self) -> impl Iterator<Item = Support> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Support> for SupportSet {
    fn from_iter<I: IntoIterator<Item = Support>>(iter: I) -> Self {
        SupportSet(iter.into_iter().collect())
    }
}

/// Per-record emission state.
#[derive(Debug, Clone)]
pub struct EmissionContext {
    buffer_name: String,
    record_name: String,
    required_support: SupportSet,
}

impl EmissionContext {
    pub fn new(record_name: impl Into<String>) -> Self {
        EmissionContext {
            buffer_name: DEFAULT_BUFFER.to_string(),
            record_name: record_name.into(),
            required_support: SupportSet::new(),
        }
    }

    pub fn with_buffer(mut self, buffer_name: impl Into<String>) -> Self {
        self.buffer_name = buffer_name.into();
        self
    }

    pub fn buffer_name(&self) -> &str {
        &self.buffer_name
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Idempotent.
    pub fn add_support(&mut self, support: Support) {
        self.required_support.insert(support);
    }

    pub fn merge_support(&mut self, support: &SupportSet) {
        self.required_support.merge(support);
    }

    pub fn required_support(&self) -> &SupportSet {
        &self.required_support
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_support_is_idempotent() {
        let mut ctx = EmissionContext::new("msg");
        ctx.add_support(Support::Strconv);
        ctx.add_support(Support::Strconv);
        assert_eq!(ctx.required_support().len(), 1);
        assert!(ctx.required_support().contains(Support::Strconv));
    }

    #[test]
    fn merge_never_shrinks() {
        let mut ctx = EmissionContext::new("msg");
        ctx.add_support(Support::Json);
        ctx.merge_support(&SupportSet::new());
        ctx.merge_support(&[Support::Base64].into_iter().collect());
        assert_eq!(
            ctx.required_support().import_paths(),
            vec!["encoding/base64", "encoding/json"]
        );
    }

    #[test]
    fn defaults() {
        let ctx = EmissionContext::new("msg").with_buffer("out");
        assert_eq!(ctx.buffer_name(), "out");
        assert_eq!(ctx.record_name(), "msg");
        assert!(ctx.required_support().is_empty());
        assert!(Support::Bytes.is_std());
        assert!(!Support::Protojson.is_std());
    }
}
