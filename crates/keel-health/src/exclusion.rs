//! Per-request alarm exclusion filter.
//!
//! Built from repeated `exclude` query values. Parsing never fails:
//! values that name no known alarm kind are kept as inert tokens so they
//! can be logged, but they never match a real alarm.

use std::collections::BTreeSet;

use crate::alarm::AlarmKind;

/// Query parameter carrying one excluded alarm kind per occurrence.
pub const EXCLUDE_PARAM: &str = "exclude";

/// Alarm kinds to disregard for a single health evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    kinds: BTreeSet<AlarmKind>,
    unrecognized: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw exclusion values. Duplicates collapse.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for value in values {
            set.insert(value.as_ref());
        }
        set
    }

    /// Build from decoded query pairs, taking every `exclude` value.
    pub fn from_query_pairs<K, V>(pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_values(
            pairs
                .iter()
                .filter(|(key, _)| key.as_ref() == EXCLUDE_PARAM)
                .map(|(_, value)| value.as_ref()),
        )
    }

    /// Add one raw value, matched case-sensitively against known names.
    pub fn insert(&mut self, value: &str) {
        match AlarmKind::from_name(value) {
            Some(kind) => {
                self.kinds.insert(kind);
            }
            None => {
                self.unrecognized.insert(value.to_string());
            }
        }
    }

    /// Whether alarms of this kind are ignored.
    ///
    /// Unrecognized alarm kinds are never excluded, even if a token with
    /// the same spelling was supplied.
    pub fn excludes(&self, kind: &AlarmKind) -> bool {
        kind.is_known() && self.kinds.contains(kind)
    }

    /// Known kinds in the filter.
    pub fn kinds(&self) -> impl Iterator<Item = &AlarmKind> {
        self.kinds.iter()
    }

    /// Tokens that named no known kind.
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.unrecognized.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty() && self.unrecognized.is_empty()
    }
}
