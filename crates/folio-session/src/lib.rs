//! Session management for Folio.
//!
//! Resolves, at any moment, exactly one of `SignedOut`, `Guest`, or
//! `Authenticated` and publishes every transition to subscribers.
//!
//! # Architecture
//!
//! - [`IdentityProvider`] is the boundary to whoever authenticates users.
//!   [`MockIdentityProvider`] stands in for a real provider and persists the
//!   signed-in user across restarts.
//! - [`GuestFlag`] is the durable "guest mode active" marker.
//! - [`SessionManager`] combines both. On start it resolves the session in a
//!   fixed order (provider session, then guest flag, then signed out) and
//!   afterwards changes state only in response to provider outcomes or
//!   explicit guest entry/exit. With
//!   [`SessionManager::follow_provider`] it also applies sign-ins and
//!   sign-outs the provider makes on its own, read through an
//!   [`IdentityWatch`].
//! - [`SessionSubscription`] replays the current session immediately, then
//!   yields every later transition in order.

pub mod error;
pub mod guest;
pub mod manager;
pub mod provider;

pub use error::{SessionError, SessionResult};
pub use guest::{FsGuestFlag, GuestFlag, InMemoryGuestFlag};
pub use manager::{SessionManager, SessionSubscription};
pub use provider::{IdentityProvider, IdentityWatch, MockIdentityConfig, MockIdentityProvider};
