//! Audit trail reconstruction: the ordered, diffed replay of every
//! temporal edge of a root identity.
//!
//! Diffs are never stored; they are recomputed from the two full snapshots
//! being compared, so the trail cannot drift from the underlying data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mdr_model::{ItemStatus, ItemUid, VersionMetadata};
use serde_json::Value;

use crate::content::ItemContent;

/// One entry of an item's audit trail: the full snapshot, the edge
/// metadata, and per-field changed-flags against the next-older entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionRecord<C> {
    pub uid: ItemUid,
    pub library_name: String,
    pub content: C,
    #[serde(flatten)]
    pub metadata: VersionMetadata,
    /// Field name -> whether it differs from the next-older record. Empty
    /// for the oldest record, which is the baseline.
    pub changes: BTreeMap<String, bool>,
}

impl<C: ItemContent> VersionRecord<C> {
    pub fn new(
        uid: ItemUid,
        library_name: String,
        content: C,
        metadata: VersionMetadata,
    ) -> Self {
        Self {
            uid,
            library_name,
            content,
            metadata,
            changes: BTreeMap::new(),
        }
    }
}

/// Flattens a content snapshot into named attribute values. Content that
/// does not serialize to a map (a bare newtype, say) is exposed under a
/// single `value` attribute.
fn content_fields<C: ItemContent>(content: &C) -> BTreeMap<String, Value> {
    match serde_json::to_value(content) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        Ok(other) => BTreeMap::from([("value".to_string(), other)]),
        Err(_) => BTreeMap::new(),
    }
}

/// Walks records (expected newest-first) pairwise and fills in each
/// record's changed-flags relative to the immediately following (older)
/// record. The oldest record keeps an empty change map. Each snapshot is
/// flattened exactly once.
pub fn with_changes<C: ItemContent>(mut records: Vec<VersionRecord<C>>) -> Vec<VersionRecord<C>> {
    let fields: Vec<BTreeMap<String, Value>> = records
        .iter()
        .map(|record| content_fields(&record.content))
        .collect();
    for (i, record) in records.iter_mut().enumerate() {
        record.changes = match fields.get(i + 1) {
            None => BTreeMap::new(),
            Some(older) => fields[i]
                .iter()
                .map(|(name, value)| (name.clone(), older.get(name) != Some(value)))
                .collect(),
        };
    }
    records
}

/// Filters records to Final versions whose `[start_date, end_date)`
/// validity interval contains `at_time`.
pub fn releases_at<C: ItemContent>(
    records: Vec<VersionRecord<C>>,
    at_time: DateTime<Utc>,
) -> Vec<VersionRecord<C>> {
    records
        .into_iter()
        .filter(|record| {
            record.metadata.status == ItemStatus::Final
                && record.metadata.start_date <= at_time
                && record.metadata.end_date.is_none_or(|end| at_time < end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mdr_model::VersionNumber;

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Term {
        name: String,
        definition: String,
    }

    impl ItemContent for Term {
        fn name(&self) -> &str {
            &self.name
        }
    }

    fn record(name: &str, definition: &str, minor: u32) -> VersionRecord<Term> {
        let mut metadata = VersionMetadata::initial("author", Utc::now());
        metadata.version = VersionNumber::new(0, minor);
        VersionRecord::new(
            ItemUid::new("Term_000001").expect("uid"),
            "Sponsor".to_string(),
            Term {
                name: name.to_string(),
                definition: definition.to_string(),
            },
            metadata,
        )
    }

    #[test]
    fn single_field_edits_flag_exactly_that_field() {
        // Newest first: definition changed in v0.3, name changed in v0.2.
        let records = with_changes(vec![
            record("SEX", "reworded", 3),
            record("SEX", "original", 2),
            record("GENDER", "original", 1),
        ]);

        assert!(records[0].changes["definition"]);
        assert!(!records[0].changes["name"]);
        assert!(records[1].changes["name"]);
        assert!(!records[1].changes["definition"]);
        assert!(records[2].changes.is_empty());
    }

    #[test]
    fn empty_history_is_fine() {
        let records: Vec<VersionRecord<Term>> = with_changes(Vec::new());
        assert!(records.is_empty());
    }
}
