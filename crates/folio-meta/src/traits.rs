//! The [`MetadataStore`] trait defining the metadata storage interface.

use async_trait::async_trait;

use folio_types::{Namespace, ProjectRecord};

use crate::error::MetaResult;

/// Storage backend for per-namespace project collections.
///
/// Implementations must be thread-safe (`Send + Sync`). Each `save` atomically
/// replaces the whole collection for its namespace, so two interleaved
/// read-modify-save sequences against one namespace lose a write; callers
/// serialize their mutations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Load the collection for `namespace`, in persisted order.
    ///
    /// Returns an empty vector if nothing was ever saved for it.
    async fn load(&self, namespace: &Namespace) -> MetaResult<Vec<ProjectRecord>>;

    /// Replace the collection for `namespace` with `records`.
    async fn save(&self, namespace: &Namespace, records: &[ProjectRecord]) -> MetaResult<()>;
}
