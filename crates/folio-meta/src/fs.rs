//! Filesystem metadata store: one JSON document per namespace.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use folio_types::{Namespace, ProjectRecord};

use crate::codec::{decode_collection, encode_collection};
use crate::error::{MetaError, MetaResult};
use crate::names::validate_storage_key;
use crate::traits::MetadataStore;

const DOCUMENT_EXT: &str = "json";

/// Metadata store keeping `<root>/<storage_key>.json` per namespace.
///
/// Saves write a temporary sibling and rename it over the document, so a
/// failed save leaves the previous collection intact. The optional quota caps
/// the summed size of all documents under `root`.
#[derive(Clone, Debug)]
pub struct FsMetadataStore {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FsMetadataStore {
    /// Open (or create) a metadata store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>, quota_bytes: Option<u64>) -> MetaResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            MetaError::Unavailable(format!(
                "failed to create metadata directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root, quota_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> MetaResult<PathBuf> {
        validate_storage_key(key)?;
        Ok(self.root.join(format!("{key}.{DOCUMENT_EXT}")))
    }

    /// Summed size of every document except `exclude`.
    async fn used_bytes_excluding(&self, exclude: &Path) -> MetaResult<u64> {
        let mut total = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == exclude || path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
                continue;
            }
            total += entry.metadata().await?.len();
        }
        Ok(total)
    }
}

/// Map an I/O failure on the document for `key`; `needed` is the size of the
/// document being written, if any.
fn map_io(err: std::io::Error, key: &str, needed: u64) -> MetaError {
    match err.kind() {
        ErrorKind::StorageFull => MetaError::QuotaExceeded {
            key: key.to_string(),
            needed,
            available: 0,
        },
        ErrorKind::PermissionDenied => MetaError::Unavailable(err.to_string()),
        _ => MetaError::Io(err),
    }
}

#[async_trait]
impl MetadataStore for FsMetadataStore {
    async fn load(&self, namespace: &Namespace) -> MetaResult<Vec<ProjectRecord>> {
        let key = namespace.storage_key();
        let path = self.document_path(&key)?;
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(MetaError::Corrupt {
                    key,
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(map_io(e, &key, 0)),
        };
        let records = decode_collection(&key, &text)?;
        debug!(key = %key, records = records.len(), "metadata loaded");
        Ok(records)
    }

    async fn save(&self, namespace: &Namespace, records: &[ProjectRecord]) -> MetaResult<()> {
        let key = namespace.storage_key();
        let path = self.document_path(&key)?;
        let text = encode_collection(&key, records)?;

        if let Some(quota) = self.quota_bytes {
            let others = self.used_bytes_excluding(&path).await?;
            let available = quota.saturating_sub(others);
            if text.len() as u64 > available {
                return Err(MetaError::QuotaExceeded {
                    key,
                    needed: text.len() as u64,
                    available,
                });
            }
        }

        let tmp = self.root.join(format!(".{key}.{DOCUMENT_EXT}.tmp"));
        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(text.as_bytes()).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(
                        path = %tmp.display(),
                        error = %cleanup,
                        "failed to remove temporary metadata file"
                    );
                }
            }
            return Err(map_io(e, &key, text.len() as u64));
        }

        debug!(key = %key, records = records.len(), bytes = text.len(), "metadata saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{ProjectId, Timestamp, UserId, NO_MEDIA};
    use tempfile::TempDir;

    fn record(id: &str, ts: u64) -> ProjectRecord {
        ProjectRecord {
            id: ProjectId::new(id).unwrap(),
            title: format!("project {id}"),
            description: "desc".into(),
            media_type: NO_MEDIA.into(),
            created_at: Timestamp::from_millis(ts),
        }
    }

    async fn store(quota: Option<u64>) -> (TempDir, FsMetadataStore) {
        let dir = TempDir::new().unwrap();
        let store = FsMetadataStore::open(dir.path().join("metadata"), quota)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let (_dir, store) = store(None).await;
        assert!(store.load(&Namespace::Guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_across_reopen() {
        let (dir, store) = store(None).await;
        let records = vec![record("2", 2), record("1", 1)];
        store.save(&Namespace::Guest, &records).await.unwrap();
        drop(store);

        let reopened = FsMetadataStore::open(dir.path().join("metadata"), None)
            .await
            .unwrap();
        assert_eq!(reopened.load(&Namespace::Guest).await.unwrap(), records);
    }

    #[tokio::test]
    async fn document_uses_persisted_field_names() {
        let (_dir, store) = store(None).await;
        store.save(&Namespace::Guest, &[record("1", 10)]).await.unwrap();
        let text = std::fs::read_to_string(store.root().join("guest.json")).unwrap();
        assert!(text.contains("\"desc\":\"desc\""));
        assert!(text.contains("\"type\":\"none\""));
        assert!(text.contains("\"timestamp\":10"));
    }

    #[tokio::test]
    async fn corrupt_document_fails_load() {
        let (_dir, store) = store(None).await;
        std::fs::write(store.root().join("guest.json"), "not json").unwrap();
        let err = store.load(&Namespace::Guest).await.unwrap_err();
        assert!(matches!(err, MetaError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn quota_blocks_oversized_save_and_keeps_previous() {
        let (_dir, store) = store(Some(200)).await;
        let user = Namespace::User(UserId::new("u1").unwrap());
        store.save(&user, &[record("1", 1)]).await.unwrap();

        let many: Vec<ProjectRecord> = (0..20).map(|i| record(&i.to_string(), i)).collect();
        let err = store.save(&user, &many).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.load(&user).await.unwrap(), vec![record("1", 1)]);
    }

    #[tokio::test]
    async fn leaves_no_temporary_files() {
        let (_dir, store) = store(None).await;
        store.save(&Namespace::Guest, &[record("1", 1)]).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["guest.json".to_string()]);
    }
}
