//! Content coordination for Folio.
//!
//! The [`Coordinator`] keeps project metadata (small, ordered, per namespace)
//! and media blobs (large, keyed by project id) consistent across two stores
//! that fail independently and share no transaction:
//!
//! - **create** writes the blob first, then saves the full metadata
//!   collection. A failed blob write aborts before any record exists; a failed
//!   metadata save leaves the blob behind as an orphan.
//! - **delete** saves the reduced metadata collection first, then deletes the
//!   blob best-effort. The metadata outcome alone decides success.
//!
//! [`Folio`] is the application context: it wires a
//! [`SessionManager`](folio_session::SessionManager) to a coordinator and
//! reloads the working set on every session transition.

pub mod app;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod working_set;

pub use app::{Folio, SessionChange};
pub use config::{CoordinatorConfig, FolioConfig, IdentityConfig};
pub use coordinator::Coordinator;
pub use error::{CoreError, CoreResult};
pub use working_set::LoadState;

// Re-export key types
pub use folio_session::SessionSubscription;
pub use folio_types::{
    MediaBlob, MediaKind, Namespace, ProjectId, ProjectRecord, Session, Timestamp, UserProfile,
};
