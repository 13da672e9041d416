use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::media::{MediaKind, NO_MEDIA};
use crate::temporal::Timestamp;

/// Opaque project identifier.
///
/// Assigned once at creation from a [`MonotonicClock`](crate::MonotonicClock)
/// reading, so ids issued by one clock are unique and increasing. The same id
/// keys the project's media blob.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Wrap an existing id. Rejects the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::EmptyProjectId);
        }
        Ok(Self(id))
    }

    /// Derive an id from a clock reading.
    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self(ts.as_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({})", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Metadata for one project.
///
/// Serialized with the persisted field names
/// `{id, title, desc, type, timestamp}`. Records are never edited in place;
/// they are created once and later removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub title: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    /// Declared media type of the attachment, or [`NO_MEDIA`].
    #[serde(rename = "type", default = "no_media")]
    pub media_type: String,
    #[serde(rename = "timestamp", default)]
    pub created_at: Timestamp,
}

impl ProjectRecord {
    /// Kind of attached media, derived from the declared type.
    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_media_type(&self.media_type)
    }

    pub fn has_media(&self) -> bool {
        !self.media_kind().is_none()
    }
}

fn no_media() -> String {
    NO_MEDIA.to_string()
}

/// Sort records newest first by `created_at`.
///
/// The sort is stable: records with equal timestamps keep their existing
/// relative order.
pub fn sort_newest_first(records: &mut [ProjectRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, ts: u64) -> ProjectRecord {
        ProjectRecord {
            id: ProjectId::new(id).unwrap(),
            title: format!("title {id}"),
            description: String::new(),
            media_type: NO_MEDIA.into(),
            created_at: Timestamp::from_millis(ts),
        }
    }

    #[test]
    fn empty_id_rejected() {
        assert_eq!(ProjectId::new(""), Err(TypeError::EmptyProjectId));
        assert!("".parse::<ProjectId>().is_err());
    }

    #[test]
    fn id_from_timestamp_is_decimal_millis() {
        let id = ProjectId::from_timestamp(Timestamp::from_millis(1_700_000_000_123));
        assert_eq!(id.as_str(), "1700000000123");
    }

    #[test]
    fn persisted_layout_field_names() {
        let rec = ProjectRecord {
            media_type: "image/png".into(),
            description: "d".into(),
            ..record("42", 100)
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["id"], "42");
        assert_eq!(value["title"], "title 42");
        assert_eq!(value["desc"], "d");
        assert_eq!(value["type"], "image/png");
        assert_eq!(value["timestamp"], 100);
    }

    #[test]
    fn legacy_record_without_optional_fields() {
        let rec: ProjectRecord = serde_json::from_str(r#"{"id":"7","title":"old"}"#).unwrap();
        assert_eq!(rec.description, "");
        assert_eq!(rec.media_type, NO_MEDIA);
        assert_eq!(rec.created_at, Timestamp::default());
        assert_eq!(rec.media_kind(), MediaKind::None);
        assert!(!rec.has_media());
    }

    #[test]
    fn sorts_descending_by_timestamp() {
        let mut records = vec![record("a", 100), record("b", 300), record("c", 200)];
        sort_newest_first(&mut records);
        let order: Vec<u64> = records.iter().map(|r| r.created_at.as_millis()).collect();
        assert_eq!(order, vec![300, 200, 100]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let mut records = vec![record("first", 5), record("newer", 9), record("second", 5)];
        sort_newest_first(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "first", "second"]);
    }

    proptest! {
        #[test]
        fn sorted_output_is_non_increasing(
            stamps in proptest::collection::vec(0u64..1_000, 0..64)
        ) {
            let mut records: Vec<ProjectRecord> = stamps
                .iter()
                .enumerate()
                .map(|(i, ts)| record(&i.to_string(), *ts))
                .collect();
            sort_newest_first(&mut records);
            for pair in records.windows(2) {
                prop_assert!(pair[0].created_at >= pair[1].created_at);
                if pair[0].created_at == pair[1].created_at {
                    let a: usize = pair[0].id.as_str().parse().unwrap();
                    let b: usize = pair[1].id.as_str().parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}
