//! Filesystem blob store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <id>.media   payload bytes
//! <id>.json    BlobManifest (media type, stored_at, size, digest)
//! ```
//!
//! Both files are written to a temporary sibling and renamed into place. The
//! payload goes first and the manifest last, so a blob only becomes visible
//! once it is complete. Delete removes the manifest first for the same reason.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use folio_types::{MediaBlob, ProjectId};

use crate::error::{BlobError, BlobResult};
use crate::manifest::BlobManifest;
use crate::traits::BlobStore;

const MAX_KEY_LEN: usize = 128;

/// Blob store backed by a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (or create) a blob store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            BlobError::Unavailable(format!(
                "failed to create blob directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, id: &ProjectId) -> BlobResult<PathBuf> {
        validate_key(id)?;
        Ok(self.root.join(format!("{id}.media")))
    }

    fn manifest_path(&self, id: &ProjectId) -> BlobResult<PathBuf> {
        validate_key(id)?;
        Ok(self.root.join(format!("{id}.json")))
    }

    async fn read_manifest(&self, id: &ProjectId) -> BlobResult<Option<BlobManifest>> {
        let path = self.manifest_path(id)?;
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(map_io(e)),
        };
        let manifest: BlobManifest = serde_json::from_slice(&raw).map_err(|e| {
            BlobError::Corrupt {
                id: id.clone(),
                reason: format!("unreadable manifest: {e}"),
            }
        })?;
        Ok(Some(manifest))
    }
}

/// Ids become file names, so only a conservative character set is accepted.
fn validate_key(id: &ProjectId) -> BlobResult<()> {
    let key = id.as_str();
    let reason = if key.is_empty() {
        Some("must not be empty")
    } else if key.len() > MAX_KEY_LEN {
        Some("too long")
    } else if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("may only contain ASCII letters, digits, '-' and '_'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(BlobError::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }),
        None => Ok(()),
    }
}

fn map_io(err: std::io::Error) -> BlobError {
    match err.kind() {
        ErrorKind::StorageFull => BlobError::QuotaExceeded(err.to_string()),
        _ => BlobError::Io(err),
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> BlobResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            if cleanup.kind() != ErrorKind::NotFound {
                warn!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "failed to remove temporary blob file"
                );
            }
        }
        return Err(map_io(e));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, id: &ProjectId, blob: &MediaBlob) -> BlobResult<()> {
        let payload = self.payload_path(id)?;
        let manifest_path = self.manifest_path(id)?;
        let start = Instant::now();

        let manifest = BlobManifest::describe(id, blob);
        let encoded = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| BlobError::Serialization(e.to_string()))?;

        write_atomic(&payload, &blob.data).await?;
        write_atomic(&manifest_path, &encoded).await?;

        debug!(
            id = %id,
            size_bytes = blob.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "blob stored"
        );
        Ok(())
    }

    async fn get(&self, id: &ProjectId) -> BlobResult<Option<MediaBlob>> {
        let Some(manifest) = self.read_manifest(id).await? else {
            return Ok(None);
        };
        let data = match fs::read(self.payload_path(id)?).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::Corrupt {
                    id: id.clone(),
                    reason: "payload missing".into(),
                })
            }
            Err(e) => return Err(map_io(e)),
        };
        manifest
            .verify(&data)
            .map_err(|reason| BlobError::Corrupt {
                id: id.clone(),
                reason,
            })?;
        Ok(Some(MediaBlob::new(manifest.media_type, data)))
    }

    async fn manifest(&self, id: &ProjectId) -> BlobResult<Option<BlobManifest>> {
        self.read_manifest(id).await
    }

    async fn delete(&self, id: &ProjectId) -> BlobResult<bool> {
        let existed = match fs::remove_file(self.manifest_path(id)?).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(map_io(e)),
        };
        match fs::remove_file(self.payload_path(id)?).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(map_io(e)),
        }
        debug!(id = %id, existed, "blob deleted");
        Ok(existed)
    }
}
