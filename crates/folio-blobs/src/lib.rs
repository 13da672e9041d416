//! Media blob storage for Folio.
//!
//! Attachments (images, videos, arbitrary files) can be tens of megabytes, far
//! beyond what the metadata tier should hold, so they live in this separate
//! key→object store. Each blob is keyed by the id of the project that owns it
//! and stored alongside its declared media type, creation timestamp, and a
//! BLAKE3 digest of the payload.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store with optional capacity, for tests and embedding
//! - [`FsBlobStore`] -- one payload file plus one JSON manifest per blob
//!
//! # Design Rules
//!
//! 1. Point lookup and delete only; there is no ordering or query capability.
//! 2. `get` of a missing id is `Ok(None)`, never an error.
//! 3. A blob is visible only once its manifest is written (payload first).
//! 4. Capacity failures surface as [`BlobError::QuotaExceeded`] so callers can
//!    tell a space problem from a generic fault.

pub mod error;
pub mod fs;
pub mod manifest;
pub mod memory;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use fs::FsBlobStore;
pub use manifest::BlobManifest;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
