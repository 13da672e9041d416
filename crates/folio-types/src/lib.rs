//! Foundation types for Folio.
//!
//! This crate provides the record, media, identity, and temporal types shared
//! by every other Folio crate.
//!
//! # Key Types
//!
//! - [`ProjectId`] — Opaque, time-derived project identifier (join key between stores)
//! - [`Timestamp`] — Millisecond creation-time reading used for display and ordering
//! - [`MonotonicClock`] — Strictly increasing timestamp source for id assignment
//! - [`ProjectRecord`] — Small textual metadata for one project
//! - [`MediaKind`] / [`MediaBlob`] — Attached media classification and payload
//! - [`Namespace`] — Storage partition derived from the session
//! - [`Session`] — `SignedOut`, `Guest`, or `Authenticated`

pub mod error;
pub mod identity;
pub mod media;
pub mod record;
pub mod temporal;

pub use error::TypeError;
pub use identity::{Namespace, Session, UserId, UserProfile, GUEST_DISPLAY_NAME};
pub use media::{MediaBlob, MediaKind, NO_MEDIA};
pub use record::{sort_newest_first, ProjectId, ProjectRecord};
pub use temporal::{MonotonicClock, Timestamp};
