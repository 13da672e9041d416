use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use folio_types::{MediaBlob, ProjectId};

use crate::error::{BlobError, BlobResult};
use crate::manifest::BlobManifest;
use crate::traits::BlobStore;

struct Entry {
    manifest: BlobManifest,
    data: Bytes,
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. An optional capacity caps the total
/// payload bytes held; a `put` that would exceed it fails with
/// [`BlobError::QuotaExceeded`].
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<ProjectId, Entry>>,
    capacity: Option<u64>,
}

impl InMemoryBlobStore {
    /// Create a new empty store with no capacity limit.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            capacity: None,
        }
    }

    /// Create a new empty store holding at most `bytes` of payload.
    pub fn with_capacity(bytes: u64) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            capacity: Some(bytes),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|e| e.manifest.size)
            .sum()
    }

    /// Return a sorted list of all ids in the store.
    pub fn all_ids(&self) -> Vec<ProjectId> {
        let map = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<ProjectId> = map.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> BlobError {
    BlobError::Unavailable("lock poisoned".into())
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, id: &ProjectId, blob: &MediaBlob) -> BlobResult<()> {
        let mut map = self.blobs.write().map_err(poisoned)?;
        if let Some(capacity) = self.capacity {
            let used: u64 = map
                .iter()
                .filter(|(k, _)| *k != id)
                .map(|(_, e)| e.manifest.size)
                .sum();
            let available = capacity.saturating_sub(used);
            if blob.len() > available {
                return Err(BlobError::QuotaExceeded(format!(
                    "need {} bytes, {} available",
                    blob.len(),
                    available
                )));
            }
        }
        map.insert(
            id.clone(),
            Entry {
                manifest: BlobManifest::describe(id, blob),
                data: blob.data.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &ProjectId) -> BlobResult<Option<MediaBlob>> {
        let map = self.blobs.read().map_err(poisoned)?;
        Ok(map
            .get(id)
            .map(|e| MediaBlob::new(e.manifest.media_type.clone(), e.data.clone())))
    }

    async fn manifest(&self, id: &ProjectId) -> BlobResult<Option<BlobManifest>> {
        let map = self.blobs.read().map_err(poisoned)?;
        Ok(map.get(id).map(|e| e.manifest.clone()))
    }

    async fn delete(&self, id: &ProjectId) -> BlobResult<bool> {
        let mut map = self.blobs.write().map_err(poisoned)?;
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ProjectId {
        ProjectId::new(s).unwrap()
    }

    fn blob(content: &[u8]) -> MediaBlob {
        MediaBlob::new("image/png", content.to_vec())
    }

    #[tokio::test]
    async fn put_and_get() {
        let store = InMemoryBlobStore::new();
        store.put(&id("1"), &blob(b"hello")).await.unwrap();

        let read_back = store.get(&id("1")).await.unwrap().expect("should exist");
        assert_eq!(read_back, blob(b"hello"));
        assert_eq!(read_back.media_type, "image/png");
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryBlobStore::new();
        assert!(store.get(&id("missing")).await.unwrap().is_none());
        assert!(!store.exists(&id("missing")).await.unwrap());
    }

    #[tokio::test]
    async fn put_replaces_existing() {
        let store = InMemoryBlobStore::new();
        store.put(&id("1"), &blob(b"old")).await.unwrap();
        store.put(&id("1"), &blob(b"newer")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id("1")).await.unwrap().unwrap().data, &b"newer"[..]);
    }

    #[tokio::test]
    async fn delete_present_and_missing() {
        let store = InMemoryBlobStore::new();
        store.put(&id("1"), &blob(b"x")).await.unwrap();
        assert!(store.delete(&id("1")).await.unwrap());
        assert!(!store.exists(&id("1")).await.unwrap());
        assert!(!store.delete(&id("1")).await.unwrap());
    }

    #[tokio::test]
    async fn manifest_records_type_and_size() {
        let store = InMemoryBlobStore::new();
        store.put(&id("9"), &MediaBlob::new("video/mp4", vec![0u8; 10])).await.unwrap();
        let manifest = store.manifest(&id("9")).await.unwrap().unwrap();
        assert_eq!(manifest.media_type, "video/mp4");
        assert_eq!(manifest.size, 10);
        assert!(manifest.stored_at.as_millis() > 0);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let store = InMemoryBlobStore::with_capacity(8);
        store.put(&id("a"), &blob(b"12345")).await.unwrap();
        let err = store.put(&id("b"), &blob(b"12345")).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn replacing_does_not_double_count_capacity() {
        let store = InMemoryBlobStore::with_capacity(8);
        store.put(&id("a"), &blob(b"12345")).await.unwrap();
        store.put(&id("a"), &blob(b"1234567")).await.unwrap();
        assert_eq!(store.total_bytes(), 7);
    }

    #[tokio::test]
    async fn all_ids_is_sorted() {
        let store = InMemoryBlobStore::new();
        for k in ["3", "1", "2"] {
            store.put(&id(k), &blob(k.as_bytes())).await.unwrap();
        }
        assert_eq!(store.all_ids(), vec![id("1"), id("2"), id("3")]);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryBlobStore::with_capacity(1);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBlobStore"));
        assert!(debug.contains("blob_count"));
    }
}
