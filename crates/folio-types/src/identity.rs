use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Display name shown while in guest mode.
pub const GUEST_DISPLAY_NAME: &str = "Guest (offline)";

/// Stable identifier issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::EmptyUserId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Storage partition for project metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The fixed, well-known guest partition.
    Guest,
    /// One partition per authenticated user.
    User(UserId),
}

impl Namespace {
    /// Key under which the partition is persisted.
    ///
    /// User keys carry a `user-` prefix so no user id can collide with the
    /// guest key.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Guest => "guest".to_string(),
            Self::User(id) => format!("user-{id}"),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// The resolved session: exactly one of three states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Session {
    SignedOut,
    Guest,
    Authenticated(UserProfile),
}

impl Session {
    /// The active namespace. `SignedOut` has none and may not touch data.
    pub fn namespace(&self) -> Option<Namespace> {
        match self {
            Self::SignedOut => None,
            Self::Guest => Some(Namespace::Guest),
            Self::Authenticated(profile) => Some(Namespace::User(profile.user_id.clone())),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::SignedOut => None,
            Self::Guest => Some(GUEST_DISPLAY_NAME),
            Self::Authenticated(profile) => Some(&profile.display_name),
        }
    }

    pub fn is_signed_out(&self) -> bool {
        matches!(self, Self::SignedOut)
    }

    /// Short state label, e.g. for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignedOut => "signed-out",
            Self::Guest => "guest",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedOut => f.write_str("signed out"),
            Self::Guest => write!(f, "{GUEST_DISPLAY_NAME}"),
            Self::Authenticated(p) => write!(f, "{} ({})", p.display_name, p.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            user_id: UserId::new(id).unwrap(),
            display_name: "Ada".into(),
            email: None,
        }
    }

    #[test]
    fn signed_out_has_no_namespace() {
        assert!(Session::SignedOut.namespace().is_none());
        assert!(Session::SignedOut.display_name().is_none());
    }

    #[test]
    fn guest_namespace_is_fixed() {
        assert_eq!(Session::Guest.namespace(), Some(Namespace::Guest));
        assert_eq!(Namespace::Guest.storage_key(), "guest");
        assert_eq!(Session::Guest.display_name(), Some(GUEST_DISPLAY_NAME));
    }

    #[test]
    fn user_named_guest_does_not_collide() {
        let ns = Session::Authenticated(profile("guest")).namespace().unwrap();
        assert_ne!(ns.storage_key(), Namespace::Guest.storage_key());
        assert_eq!(ns.storage_key(), "user-guest");
    }

    #[test]
    fn empty_user_id_rejected() {
        assert_eq!(UserId::new(""), Err(TypeError::EmptyUserId));
    }

    #[test]
    fn profile_roundtrips_without_email() {
        let p = profile("user_abc");
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("email"));
        let back: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
