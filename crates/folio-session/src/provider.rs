use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::fs;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tracing::{info, warn};

use folio_types::{UserId, UserProfile};

use crate::error::{SessionError, SessionResult};

/// Boundary to the service that authenticates users.
///
/// The provider owns the persisted authenticated session; nothing else may
/// fabricate one.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The persisted authenticated user, if a session survives.
    async fn current_user(&self) -> SessionResult<Option<UserProfile>>;

    /// Authenticate a user and persist the session.
    async fn sign_in(&self) -> SessionResult<UserProfile>;

    /// End the persisted session.
    async fn sign_out(&self) -> SessionResult<()>;

    /// Watch the provider's signed-in user.
    ///
    /// The watch yields the current user first, then every later change,
    /// including ones the provider makes on its own (expiry, sign-out from
    /// elsewhere).
    async fn on_state_change(&self) -> SessionResult<IdentityWatch>;
}

/// Capacity of a provider's change channel.
const WATCH_CAPACITY: usize = 16;

/// Ordered stream of a provider's signed-in user.
pub struct IdentityWatch {
    initial: Option<Option<UserProfile>>,
    events: broadcast::Receiver<Option<UserProfile>>,
}

impl IdentityWatch {
    /// A watch that replays `current` and then follows `events`.
    pub fn new(
        current: Option<UserProfile>,
        events: broadcast::Receiver<Option<UserProfile>>,
    ) -> Self {
        Self {
            initial: Some(current),
            events,
        }
    }

    /// Wait for the next user state. Returns `None` once the provider is
    /// gone.
    pub async fn next(&mut self) -> Option<Option<UserProfile>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.events.recv().await {
                Ok(user) => return Some(user),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "identity watch lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Settings for [`MockIdentityProvider`].
#[derive(Clone, Debug)]
pub struct MockIdentityConfig {
    /// Display name given to every signed-in user.
    pub display_name: String,
    pub email: Option<String>,
    /// Artificial delay applied to sign-in and sign-out.
    pub latency: Duration,
}

impl Default for MockIdentityConfig {
    fn default() -> Self {
        Self {
            display_name: "Local User".into(),
            email: None,
            latency: Duration::ZERO,
        }
    }
}

/// Stand-in identity provider.
///
/// Every sign-in succeeds with a fresh `user_<9 chars>` id. When created with
/// [`persistent`](Self::persistent), the signed-in profile is written to a JSON
/// file and restored on the next start, like a provider with local session
/// persistence.
pub struct MockIdentityProvider {
    config: MockIdentityConfig,
    path: Option<PathBuf>,
    current: Mutex<Option<UserProfile>>,
    changes: broadcast::Sender<Option<UserProfile>>,
}

impl MockIdentityProvider {
    /// A provider whose session lives only as long as the process.
    pub fn in_memory(config: MockIdentityConfig) -> Self {
        Self {
            config,
            path: None,
            current: Mutex::new(None),
            changes: broadcast::channel(WATCH_CAPACITY).0,
        }
    }

    /// A provider that persists its session at `path`.
    ///
    /// An unreadable session file is treated as no session.
    pub async fn persistent(path: impl Into<PathBuf>, config: MockIdentityConfig) -> Self {
        let path = path.into();
        let restored = match fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<UserProfile>(&raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "ignoring unreadable identity session"
                    );
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read identity session");
                None
            }
        };
        Self {
            config,
            path: Some(path),
            current: Mutex::new(restored),
            changes: broadcast::channel(WATCH_CAPACITY).0,
        }
    }

    async fn persist(&self, profile: &UserProfile) -> SessionResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded =
            serde_json::to_vec_pretty(profile).map_err(|e| SessionError::Auth(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SessionError::Auth(format!("cannot persist session: {e}")))?;
        }
        fs::write(path, encoded)
            .await
            .map_err(|e| SessionError::Auth(format!("cannot persist session: {e}")))
    }

    async fn forget(&self) -> SessionResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Auth(format!("cannot clear session: {e}"))),
        }
    }

    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }
}

fn generate_user_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("user_{suffix}")
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn current_user(&self) -> SessionResult<Option<UserProfile>> {
        Ok(self.current.lock().await.clone())
    }

    async fn sign_in(&self) -> SessionResult<UserProfile> {
        self.simulate_latency().await;
        let user_id =
            UserId::new(generate_user_id()).map_err(|e| SessionError::Auth(e.to_string()))?;
        let profile = UserProfile {
            user_id,
            display_name: self.config.display_name.clone(),
            email: self.config.email.clone(),
        };

        let mut current = self.current.lock().await;
        self.persist(&profile).await?;
        *current = Some(profile.clone());
        // No watchers is fine.
        let _ = self.changes.send(Some(profile.clone()));
        info!(user = %profile.user_id, "mock provider signed in");
        Ok(profile)
    }

    async fn sign_out(&self) -> SessionResult<()> {
        self.simulate_latency().await;
        let mut current = self.current.lock().await;
        self.forget().await?;
        if current.take().is_some() {
            let _ = self.changes.send(None);
            info!("mock provider signed out");
        }
        Ok(())
    }

    async fn on_state_change(&self) -> SessionResult<IdentityWatch> {
        // Subscribing under the lock keeps a change from slipping between the
        // snapshot and the subscription.
        let current = self.current.lock().await;
        Ok(IdentityWatch::new(current.clone(), self.changes.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = generate_user_id();
        assert!(id.starts_with("user_"));
        assert_eq!(id.len(), 14);
        assert!(id[5..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn in_memory_sign_in_and_out() {
        let provider = MockIdentityProvider::in_memory(MockIdentityConfig::default());
        assert!(provider.current_user().await.unwrap().is_none());

        let profile = provider.sign_in().await.unwrap();
        assert_eq!(profile.display_name, "Local User");
        assert_eq!(provider.current_user().await.unwrap(), Some(profile));

        provider.sign_out().await.unwrap();
        assert!(provider.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn persistent_session_is_restored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("identity.json");
        let config = MockIdentityConfig {
            display_name: "Ada".into(),
            email: Some("ada@example.com".into()),
            ..Default::default()
        };

        let profile = MockIdentityProvider::persistent(&path, config.clone())
            .await
            .sign_in()
            .await
            .unwrap();

        let restarted = MockIdentityProvider::persistent(&path, config.clone()).await;
        assert_eq!(restarted.current_user().await.unwrap(), Some(profile));

        restarted.sign_out().await.unwrap();
        let again = MockIdentityProvider::persistent(&path, config).await;
        assert!(again.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_session_file_means_signed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "{oops").unwrap();
        let provider = MockIdentityProvider::persistent(&path, MockIdentityConfig::default()).await;
        assert!(provider.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn watch_replays_current_then_follows_changes() {
        let provider = MockIdentityProvider::in_memory(MockIdentityConfig::default());
        let first = provider.sign_in().await.unwrap();

        let mut watch = provider.on_state_change().await.unwrap();
        assert_eq!(watch.next().await, Some(Some(first)));

        provider.sign_out().await.unwrap();
        let second = provider.sign_in().await.unwrap();
        assert_eq!(watch.next().await, Some(None));
        assert_eq!(watch.next().await, Some(Some(second)));
    }

    #[tokio::test]
    async fn watch_ends_when_provider_dropped() {
        let provider = MockIdentityProvider::in_memory(MockIdentityConfig::default());
        let mut watch = provider.on_state_change().await.unwrap();
        assert_eq!(watch.next().await, Some(None));
        drop(provider);
        assert_eq!(watch.next().await, None);
    }

    #[tokio::test]
    async fn each_sign_in_issues_a_new_id() {
        let provider = MockIdentityProvider::in_memory(MockIdentityConfig::default());
        let a = provider.sign_in().await.unwrap();
        let b = provider.sign_in().await.unwrap();
        assert_ne!(a.user_id, b.user_id);
    }
}
