//! Metadata storage for Folio.
//!
//! Each [`Namespace`](folio_types::Namespace) owns one ordered collection of
//! [`ProjectRecord`](folio_types::ProjectRecord)s, persisted as a single JSON
//! document under the namespace's storage key.
//!
//! # Contract
//!
//! - `load` of a namespace that was never saved returns an empty collection.
//! - `load` of an unreadable document fails; it is never silently emptied.
//! - `save` is a **full replace**: callers always pass the complete desired
//!   collection. There is no append or patch operation.
//! - Ids must be unique within a collection; `save` rejects duplicates.
//!
//! # Modules
//!
//! - [`error`] — Error types for metadata operations
//! - [`traits`] — The [`MetadataStore`] trait
//! - [`codec`] — JSON encoding shared by all backends
//! - [`names`] — Storage key validation
//! - [`memory`] — In-memory [`InMemoryMetadataStore`] with an optional quota
//! - [`fs`] — One-file-per-namespace [`FsMetadataStore`]

pub mod codec;
pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;

pub use error::{MetaError, MetaResult};
pub use fs::FsMetadataStore;
pub use memory::InMemoryMetadataStore;
pub use names::validate_storage_key;
pub use traits::MetadataStore;
