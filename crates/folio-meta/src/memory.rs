//! In-memory metadata store for testing and ephemeral use.
//!
//! [`InMemoryMetadataStore`] keeps each namespace's collection as its encoded
//! JSON text in a `HashMap` behind a `RwLock`, so capacity accounting and
//! decode failures behave like a persisted text store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use folio_types::{Namespace, ProjectRecord};

use crate::codec::{decode_collection, encode_collection};
use crate::error::{MetaError, MetaResult};
use crate::names::validate_storage_key;
use crate::traits::MetadataStore;

/// An in-memory implementation of [`MetadataStore`].
///
/// The optional quota caps the summed size of all namespace documents.
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    documents: RwLock<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl InMemoryMetadataStore {
    /// Create a new empty store with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store whose documents may total at most `bytes`.
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    /// Store raw document text for `namespace`, bypassing encoding.
    pub fn insert_raw(&self, namespace: &Namespace, text: impl Into<String>) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.storage_key(), text.into());
    }

    /// Raw document text for `namespace`, if any.
    pub fn raw(&self, namespace: &Namespace) -> Option<String> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&namespace.storage_key())
            .cloned()
    }

    /// Summed size of all documents in bytes.
    pub fn used_bytes(&self) -> u64 {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|d| d.len() as u64)
            .sum()
    }
}

fn poisoned<T>(e: PoisonError<T>) -> MetaError {
    MetaError::Unavailable(format!("lock poisoned: {e}"))
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn load(&self, namespace: &Namespace) -> MetaResult<Vec<ProjectRecord>> {
        let key = namespace.storage_key();
        validate_storage_key(&key)?;

        let documents = self.documents.read().map_err(poisoned)?;
        match documents.get(&key) {
            Some(text) => decode_collection(&key, text),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, namespace: &Namespace, records: &[ProjectRecord]) -> MetaResult<()> {
        let key = namespace.storage_key();
        validate_storage_key(&key)?;
        let text = encode_collection(&key, records)?;

        let mut documents = self.documents.write().map_err(poisoned)?;
        if let Some(quota) = self.quota_bytes {
            let others: u64 = documents
                .iter()
                .filter(|(k, _)| **k != key)
                .map(|(_, d)| d.len() as u64)
                .sum();
            let available = quota.saturating_sub(others);
            if text.len() as u64 > available {
                return Err(MetaError::QuotaExceeded {
                    key,
                    needed: text.len() as u64,
                    available,
                });
            }
        }
        debug!(key = %key, records = records.len(), bytes = text.len(), "metadata saved");
        documents.insert(key, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{ProjectId, Timestamp, UserId, NO_MEDIA};

    fn record(id: &str, ts: u64) -> ProjectRecord {
        ProjectRecord {
            id: ProjectId::new(id).unwrap(),
            title: format!("project {id}"),
            description: String::new(),
            media_type: NO_MEDIA.into(),
            created_at: Timestamp::from_millis(ts),
        }
    }

    fn user(id: &str) -> Namespace {
        Namespace::User(UserId::new(id).unwrap())
    }

    #[tokio::test]
    async fn load_unknown_namespace_is_empty() {
        let store = InMemoryMetadataStore::new();
        assert!(store.load(&Namespace::Guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemoryMetadataStore::new();
        let records = vec![record("1", 1), record("2", 2)];
        store.save(&Namespace::Guest, &records).await.unwrap();
        assert_eq!(store.load(&Namespace::Guest).await.unwrap(), records);
    }

    #[tokio::test]
    async fn save_is_full_replace() {
        let store = InMemoryMetadataStore::new();
        store
            .save(&Namespace::Guest, &[record("1", 1), record("2", 2)])
            .await
            .unwrap();
        store.save(&Namespace::Guest, &[record("3", 3)]).await.unwrap();

        let loaded = store.load(&Namespace::Guest).await.unwrap();
        assert_eq!(loaded, vec![record("3", 3)]);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryMetadataStore::new();
        store.save(&user("alice"), &[record("1", 1)]).await.unwrap();
        store.save(&Namespace::Guest, &[record("2", 2)]).await.unwrap();

        assert_eq!(store.load(&user("alice")).await.unwrap(), vec![record("1", 1)]);
        assert_eq!(store.load(&Namespace::Guest).await.unwrap(), vec![record("2", 2)]);
        assert!(store.load(&user("bob")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_fails_load() {
        let store = InMemoryMetadataStore::new();
        store.insert_raw(&Namespace::Guest, "[{broken");
        let err = store.load(&Namespace::Guest).await.unwrap_err();
        assert!(matches!(err, MetaError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn quota_exceeded_leaves_previous_document() {
        let store = InMemoryMetadataStore::with_quota(120);
        store.save(&Namespace::Guest, &[record("1", 1)]).await.unwrap();
        let before = store.raw(&Namespace::Guest).unwrap();

        let many: Vec<ProjectRecord> = (0..10).map(|i| record(&i.to_string(), i)).collect();
        let err = store.save(&Namespace::Guest, &many).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.raw(&Namespace::Guest).unwrap(), before);
    }

    #[tokio::test]
    async fn quota_counts_other_namespaces() {
        let store = InMemoryMetadataStore::with_quota(150);
        store.save(&user("a"), &[record("1", 1)]).await.unwrap();
        let used = store.used_bytes();
        assert!(used > 0);

        let err = store
            .save(&Namespace::Guest, &[record("2", 2), record("3", 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MetaError::QuotaExceeded { available, .. } if available == 150 - used
        ));
    }

    #[tokio::test]
    async fn duplicate_ids_rejected_on_save() {
        let store = InMemoryMetadataStore::new();
        let err = store
            .save(&Namespace::Guest, &[record("1", 1), record("1", 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, MetaError::DuplicateId { .. }));
        assert!(store.raw(&Namespace::Guest).is_none());
    }

    #[tokio::test]
    async fn invalid_user_key_rejected() {
        let store = InMemoryMetadataStore::new();
        let err = store.load(&user("../../etc")).await.unwrap_err();
        assert!(matches!(err, MetaError::InvalidKey { .. }));
    }
}
