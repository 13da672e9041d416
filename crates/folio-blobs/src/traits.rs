use async_trait::async_trait;

use folio_types::{MediaBlob, ProjectId};

use crate::error::BlobResult;
use crate::manifest::BlobManifest;

/// Key→binary-object store for project media.
///
/// All implementations must satisfy these invariants:
/// - A blob is keyed by the owning project's id; `put` under an existing id
///   replaces it.
/// - `get`/`manifest` of a missing id return `Ok(None)`. Absence is a valid
///   state ("no media attached" or "media lost").
/// - A payload that fails verification is reported as an error, never
///   returned as if it were intact.
/// - Backends must accept payloads of tens of megabytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `blob` under `id`, replacing any previous blob.
    async fn put(&self, id: &ProjectId, blob: &MediaBlob) -> BlobResult<()>;

    /// Fetch the blob stored under `id`.
    async fn get(&self, id: &ProjectId) -> BlobResult<Option<MediaBlob>>;

    /// Fetch only the descriptor of the blob stored under `id`.
    async fn manifest(&self, id: &ProjectId) -> BlobResult<Option<BlobManifest>>;

    /// Delete the blob under `id`. Returns `true` if it existed.
    async fn delete(&self, id: &ProjectId) -> BlobResult<bool>;

    /// Check whether a blob is stored under `id`.
    async fn exists(&self, id: &ProjectId) -> BlobResult<bool> {
        Ok(self.manifest(id).await?.is_some())
    }
}
