use serde::{Deserialize, Serialize};

use folio_types::{MediaBlob, ProjectId, Timestamp};

/// Descriptor stored next to every blob payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobManifest {
    pub id: ProjectId,
    pub media_type: String,
    pub stored_at: Timestamp,
    pub size: u64,
    /// Hex-encoded BLAKE3 digest of the payload.
    pub digest: String,
}

impl BlobManifest {
    /// Describe `blob` as stored under `id` now.
    pub fn describe(id: &ProjectId, blob: &MediaBlob) -> Self {
        Self {
            id: id.clone(),
            media_type: blob.media_type.clone(),
            stored_at: Timestamp::now(),
            size: blob.len(),
            digest: digest_hex(&blob.data),
        }
    }

    /// Check a payload against this manifest, returning the mismatch reason.
    pub fn verify(&self, data: &[u8]) -> Result<(), String> {
        if data.len() as u64 != self.size {
            return Err(format!(
                "size mismatch: manifest says {}, payload has {}",
                self.size,
                data.len()
            ));
        }
        let computed = digest_hex(data);
        if computed != self.digest {
            return Err(format!(
                "digest mismatch: expected {}, computed {}",
                self.digest, computed
            ));
        }
        Ok(())
    }
}

fn digest_hex(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}
