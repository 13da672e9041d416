use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use folio_blobs::{BlobStore, FsBlobStore};
use folio_meta::{FsMetadataStore, MetadataStore};
use folio_session::{
    FsGuestFlag, GuestFlag, IdentityProvider, MockIdentityConfig, MockIdentityProvider,
    SessionManager, SessionSubscription,
};
use folio_types::{MediaBlob, ProjectId, ProjectRecord, Session};

use crate::config::{CoordinatorConfig, FolioConfig};
use crate::coordinator::Coordinator;
use crate::error::{CoreError, CoreResult};

/// Outcome of a session transition.
///
/// The transition itself succeeded; `load_error` carries the failure of the
/// reload that follows it, if any.
#[derive(Debug)]
pub struct SessionChange {
    pub session: Session,
    pub load_error: Option<CoreError>,
}

/// Application context: one session manager and one coordinator.
///
/// Every transition clears the working set and reloads it for the new
/// namespace before returning.
pub struct Folio {
    session: Arc<SessionManager>,
    coordinator: Coordinator,
}

impl Folio {
    /// Assemble a context from explicit parts.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        guest_flag: Arc<dyn GuestFlag>,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        config: CoordinatorConfig,
    ) -> Self {
        let session = Arc::new(SessionManager::new(provider, guest_flag));
        let coordinator = Coordinator::new(session.clone(), metadata, blobs, config);
        Self {
            session,
            coordinator,
        }
    }

    /// Open the file-backed stores under `config.data_dir`.
    pub async fn open(config: &FolioConfig) -> CoreResult<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| {
                CoreError::StorageUnavailable(format!("{}: {}", config.data_dir.display(), e))
            })?;

        let metadata =
            FsMetadataStore::open(config.metadata_dir(), config.metadata_quota_bytes).await?;
        let blobs = FsBlobStore::open(config.media_dir()).await?;
        let identity = MockIdentityConfig {
            display_name: config.identity.display_name.clone(),
            email: config.identity.email.clone(),
            latency: Duration::from_millis(config.identity.latency_ms),
        };
        let provider = MockIdentityProvider::persistent(config.identity_path(), identity).await;
        let guest_flag = FsGuestFlag::new(config.guest_flag_path());

        info!(data_dir = %config.data_dir.display(), "folio opened");
        Ok(Self::new(
            Arc::new(provider),
            Arc::new(guest_flag),
            Arc::new(metadata),
            Arc::new(blobs),
            config.coordinator(),
        ))
    }

    /// Restore the persisted session, start following the identity
    /// provider, and load the working set.
    ///
    /// A session change made by the provider itself hides the old working
    /// set immediately; call [`reload`](Self::reload) to load the new one.
    pub async fn start(&self) -> SessionChange {
        self.session.resolve().await;
        if let Err(e) = self.session.follow_provider().await {
            warn!(error = %e, "not following identity provider changes");
        }
        self.reload().await
    }

    // ---- Session ----

    pub fn session(&self) -> Session {
        self.session.current()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        self.session.subscribe()
    }

    pub async fn sign_in(&self) -> CoreResult<SessionChange> {
        self.session.sign_in().await?;
        Ok(self.reload().await)
    }

    pub async fn enter_guest(&self) -> CoreResult<SessionChange> {
        self.session.enter_guest().await?;
        Ok(self.reload().await)
    }

    pub async fn sign_out(&self) -> CoreResult<SessionChange> {
        self.session.sign_out().await?;
        Ok(self.reload().await)
    }

    /// Clear the working set and load it for the current session.
    pub async fn reload(&self) -> SessionChange {
        self.coordinator.reset();
        let session = self.session.current();
        if session.is_signed_out() {
            return SessionChange {
                session,
                load_error: None,
            };
        }
        let load_error = match self.coordinator.load_all().await {
            Ok(_) => None,
            Err(e) => {
                warn!(session = %session, error = %e, "projects unavailable after session change");
                Some(e)
            }
        };
        SessionChange {
            session,
            load_error,
        }
    }

    // ---- Projects ----

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn projects(&self) -> Vec<ProjectRecord> {
        self.coordinator.records()
    }

    pub async fn create(
        &self,
        title: &str,
        description: &str,
        file: Option<MediaBlob>,
    ) -> CoreResult<ProjectRecord> {
        self.coordinator.create(title, description, file).await
    }

    pub async fn delete(&self, id: &ProjectId) -> CoreResult<bool> {
        self.coordinator.delete(id).await
    }

    pub async fn media_for(&self, id: &ProjectId) -> Option<MediaBlob> {
        self.coordinator.media_for(id).await
    }
}

impl std::fmt::Debug for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Folio")
            .field("session", &self.session.current())
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
