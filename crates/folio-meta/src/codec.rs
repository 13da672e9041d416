//! JSON encoding of project collections.

use std::collections::HashSet;

use tracing::warn;

use folio_types::ProjectRecord;

use crate::error::{MetaError, MetaResult};

/// Encode a collection as a compact JSON array, rejecting repeated ids.
pub fn encode_collection(key: &str, records: &[ProjectRecord]) -> MetaResult<String> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(&record.id) {
            return Err(MetaError::DuplicateId {
                key: key.to_string(),
                id: record.id.to_string(),
            });
        }
    }
    serde_json::to_string(records).map_err(|e| MetaError::Serialization(e.to_string()))
}

/// Decode a persisted JSON array.
///
/// A document that is not a valid array of records is [`MetaError::Corrupt`].
/// Repeated ids keep their first occurrence; later copies are dropped with a
/// warning so the collection can be saved again.
pub fn decode_collection(key: &str, text: &str) -> MetaResult<Vec<ProjectRecord>> {
    let records: Vec<ProjectRecord> =
        serde_json::from_str(text).map_err(|e| MetaError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

    let mut seen = HashSet::with_capacity(records.len());
    let before = records.len();
    let records: Vec<ProjectRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    if records.len() != before {
        warn!(
            key,
            dropped = before - records.len(),
            "dropped records with duplicate ids"
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{ProjectId, Timestamp, NO_MEDIA};

    fn record(id: &str, ts: u64) -> ProjectRecord {
        ProjectRecord {
            id: ProjectId::new(id).unwrap(),
            title: "t".into(),
            description: String::new(),
            media_type: NO_MEDIA.into(),
            created_at: Timestamp::from_millis(ts),
        }
    }

    #[test]
    fn encode_preserves_order() {
        let text = encode_collection("guest", &[record("2", 2), record("1", 1)]).unwrap();
        let back = decode_collection("guest", &text).unwrap();
        assert_eq!(back[0].id.as_str(), "2");
        assert_eq!(back[1].id.as_str(), "1");
    }

    #[test]
    fn encode_rejects_duplicate_ids() {
        let err = encode_collection("guest", &[record("1", 1), record("1", 2)]).unwrap_err();
        assert!(matches!(err, MetaError::DuplicateId { .. }));
    }

    #[test]
    fn decode_garbage_is_corrupt() {
        let err = decode_collection("guest", "{not json").unwrap_err();
        assert!(matches!(err, MetaError::Corrupt { .. }));
    }

    #[test]
    fn decode_object_instead_of_array_is_corrupt() {
        let err = decode_collection("guest", r#"{"id":"1"}"#).unwrap_err();
        assert!(matches!(err, MetaError::Corrupt { .. }));
    }

    #[test]
    fn decode_drops_later_duplicates() {
        let text = r#"[{"id":"1","title":"first","timestamp":1},{"id":"1","title":"again","timestamp":2}]"#;
        let records = decode_collection("guest", text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "first");
    }

    #[test]
    fn decode_reads_persisted_layout() {
        let text = r#"[{"id":"1700000000000","title":"Trip","desc":"beach","type":"video/mp4","timestamp":1700000000001}]"#;
        let records = decode_collection("user-x", text).unwrap();
        assert_eq!(records[0].description, "beach");
        assert_eq!(records[0].media_type, "video/mp4");
        assert_eq!(records[0].created_at.as_millis(), 1_700_000_000_001);
    }
}
