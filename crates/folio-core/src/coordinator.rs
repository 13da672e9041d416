use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use folio_blobs::BlobStore;
use folio_meta::MetadataStore;
use folio_session::SessionManager;
use folio_types::{
    MediaBlob, MonotonicClock, Namespace, ProjectId, ProjectRecord, Session, NO_MEDIA,
};

use crate::config::CoordinatorConfig;
use crate::error::{CoreError, CoreResult};
use crate::working_set::{LoadState, WorkingSet};

/// Media type recorded for an attachment that declares none.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Keeps the metadata store, the blob store, and the in-memory working set
/// consistent for the active namespace.
///
/// Mutations (`load_all`, `create`, `delete`) are serialized; media reads run
/// concurrently with them and with each other.
pub struct Coordinator {
    session: Arc<SessionManager>,
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    config: CoordinatorConfig,
    clock: MonotonicClock,
    working: RwLock<WorkingSet>,
    mutations: Mutex<()>,
}

impl Coordinator {
    pub fn new(
        session: Arc<SessionManager>,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            session,
            metadata,
            blobs,
            config,
            clock: MonotonicClock::new(),
            working: RwLock::new(WorkingSet::new()),
            mutations: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn session(&self) -> Session {
        self.session.current()
    }

    /// Load state of the working set.
    pub fn state(&self) -> LoadState {
        self.read_working().state()
    }

    /// Snapshot of the working set, newest first.
    ///
    /// Empty while signed out, before the first load, and whenever the set was
    /// loaded for a namespace other than the current one.
    pub fn records(&self) -> Vec<ProjectRecord> {
        let Some(namespace) = self.session.namespace() else {
            return Vec::new();
        };
        self.read_working()
            .records_for(&namespace)
            .map(<[ProjectRecord]>::to_vec)
            .unwrap_or_default()
    }

    /// Forget the working set. Called when the session changes.
    pub fn reset(&self) {
        self.write_working().reset();
        debug!("working set cleared");
    }

    // ---- Load ----

    /// Replace the working set with the active namespace's persisted
    /// collection, sorted newest first.
    ///
    /// While signed out the working set is cleared and `SignedOut` returned.
    /// On a store failure the working set is left empty.
    pub async fn load_all(&self) -> CoreResult<Vec<ProjectRecord>> {
        let _guard = self.mutations.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> CoreResult<Vec<ProjectRecord>> {
        let Some(namespace) = self.session.namespace() else {
            self.write_working().reset();
            return Err(CoreError::SignedOut);
        };
        self.write_working().begin_load(namespace.clone());

        let loaded = with_deadline(self.config.store_timeout, self.metadata.load(&namespace)).await;

        if self.session.namespace().as_ref() != Some(&namespace) {
            self.write_working().reset();
            return Err(CoreError::InvalidOperation(
                "session changed while loading".into(),
            ));
        }

        match loaded {
            Ok(records) => {
                if let Some(newest) = records.iter().map(|r| r.created_at).max() {
                    self.clock.observe(newest);
                }
                let mut working = self.write_working();
                working.finish_load(records);
                let snapshot = working
                    .records_for(&namespace)
                    .map(<[_]>::to_vec)
                    .unwrap_or_default();
                info!(
                    namespace = %namespace.storage_key(),
                    count = snapshot.len(),
                    "working set loaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.write_working().fail_load();
                warn!(namespace = %namespace.storage_key(), error = %e, "failed to load projects");
                Err(e)
            }
        }
    }

    /// The active namespace, loading its collection first if the working set
    /// does not hold it. Called with the mutation lock held.
    async fn ensure_loaded(&self) -> CoreResult<Namespace> {
        let namespace = self.session.namespace().ok_or(CoreError::SignedOut)?;
        if self.read_working().is_loaded_for(&namespace) {
            return Ok(namespace);
        }
        match self.load_locked().await {
            Ok(_) => Ok(namespace),
            Err(CoreError::SignedOut) => Err(CoreError::SignedOut),
            Err(e) => Err(CoreError::StorageUnavailable(format!(
                "project list could not be loaded: {e}"
            ))),
        }
    }

    // ---- Create ----

    /// Create a project, storing `file` as its media when given.
    ///
    /// The title and description are trimmed; an empty title or an oversized
    /// file fails validation before any store is touched. The blob is written
    /// before the metadata. If the metadata save fails the blob stays behind
    /// unreferenced and the working set is unchanged.
    pub async fn create(
        &self,
        title: &str,
        description: &str,
        file: Option<MediaBlob>,
    ) -> CoreResult<ProjectRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("title is required".into()));
        }
        if let Some(blob) = &file {
            if blob.len() > self.config.max_media_bytes {
                return Err(CoreError::Validation(format!(
                    "file is too large ({} bytes, limit {} bytes)",
                    blob.len(),
                    self.config.max_media_bytes
                )));
            }
        }

        let _guard = self.mutations.lock().await;
        let namespace = self.ensure_loaded().await?;

        let (id, created_at) = self.next_id();
        let media_type = match &file {
            Some(blob) => attachment_media_type(&blob.media_type),
            None => NO_MEDIA.to_string(),
        };

        if let Some(blob) = &file {
            let blob = MediaBlob::new(media_type.clone(), blob.data.clone());
            let stored = with_deadline(self.config.store_timeout, self.blobs.put(&id, &blob)).await;
            if let Err(e) = stored {
                warn!(id = %id, error = %e, "failed to store media; project not created");
                return Err(e);
            }
            debug!(id = %id, bytes = blob.len(), "media stored");
        }

        let record = ProjectRecord {
            id: id.clone(),
            title: title.to_string(),
            description: description.trim().to_string(),
            media_type,
            created_at,
        };
        let next = self.read_working().with_record(record.clone());

        let saved = with_deadline(self.config.store_timeout, self.metadata.save(&namespace, &next));
        match saved.await {
            Ok(()) => {
                if !self.write_working().commit(&namespace, next) {
                    debug!(id = %id, "session changed during create; working set not updated");
                }
                info!(
                    id = %id,
                    namespace = %namespace.storage_key(),
                    media = %record.media_kind(),
                    "project created"
                );
                Ok(record)
            }
            Err(e) => {
                if file.is_some() {
                    warn!(id = %id, error = %e, "metadata save failed; stored media is orphaned");
                } else {
                    warn!(id = %id, error = %e, "metadata save failed; project not created");
                }
                Err(e)
            }
        }
    }

    /// A fresh id that no record in the working set uses.
    fn next_id(&self) -> (ProjectId, folio_types::Timestamp) {
        let working = self.read_working();
        loop {
            let ts = self.clock.tick();
            let id = ProjectId::from_timestamp(ts);
            if !working.contains(&id) {
                return (id, ts);
            }
        }
    }

    // ---- Delete ----

    /// Delete a project and its media.
    ///
    /// Returns `false` without touching either store when no record has `id`.
    /// The metadata save decides the outcome: on failure the record stays in
    /// the working set and the error is returned. The media delete is
    /// attempted either way and its failure is only logged.
    pub async fn delete(&self, id: &ProjectId) -> CoreResult<bool> {
        let _guard = self.mutations.lock().await;
        let namespace = self.ensure_loaded().await?;

        let Some(next) = self.read_working().without(id) else {
            debug!(id = %id, "no such project; nothing to delete");
            return Ok(false);
        };

        let saved = self.metadata.save(&namespace, &next);
        let saved = with_deadline(self.config.store_timeout, saved).await;
        if saved.is_ok() && !self.write_working().commit(&namespace, next) {
            debug!(id = %id, "session changed during delete; working set not updated");
        }

        match with_deadline(self.config.store_timeout, self.blobs.delete(id)).await {
            Ok(true) => debug!(id = %id, "media deleted"),
            Ok(false) => {}
            Err(e) => warn!(id = %id, error = %e, "failed to delete media"),
        }

        match saved {
            Ok(()) => {
                info!(id = %id, namespace = %namespace.storage_key(), "project deleted");
                Ok(true)
            }
            Err(e) => {
                warn!(id = %id, error = %e, "metadata save failed; project kept");
                Err(e)
            }
        }
    }

    // ---- Media ----

    /// Media attached to a project in the working set.
    ///
    /// Returns `None` for projects without media, for ids outside the working
    /// set, and when the blob store fails (the failure is logged).
    pub async fn media_for(&self, id: &ProjectId) -> Option<MediaBlob> {
        if !self.in_working_set(id) {
            debug!(id = %id, "media requested for unknown project");
            return None;
        }
        fetch_blob(self.blobs.clone(), self.config.store_timeout, id.clone())
            .await
            .1
    }

    /// Fetch media for many projects concurrently.
    ///
    /// Results arrive in completion order, not request order. Each id is
    /// reported exactly once; a failed fetch yields `None` for that id alone.
    pub async fn fetch_media(&self, ids: &[ProjectId]) -> Vec<(ProjectId, Option<MediaBlob>)> {
        let mut results = Vec::with_capacity(ids.len());
        let mut tasks = JoinSet::new();
        for id in ids {
            if self.in_working_set(id) {
                tasks.spawn(fetch_blob(self.blobs.clone(), self.config.store_timeout, id.clone()));
            } else {
                results.push((id.clone(), None));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => results.push(pair),
                Err(e) => warn!(error = %e, "media fetch task failed"),
            }
        }

        // A task that panicked never reported its id.
        for id in ids {
            if !results.iter().any(|(seen, _)| seen == id) {
                results.push((id.clone(), None));
            }
        }
        results
    }

    fn in_working_set(&self, id: &ProjectId) -> bool {
        let Some(namespace) = self.session.namespace() else {
            return false;
        };
        self.read_working()
            .records_for(&namespace)
            .is_some_and(|records| records.iter().any(|r| &r.id == id))
    }

    fn read_working(&self) -> RwLockReadGuard<'_, WorkingSet> {
        self.working.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_working(&self) -> RwLockWriteGuard<'_, WorkingSet> {
        self.working.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Media type recorded for an attached file. An attachment always counts as
/// media, so a missing or `none` declaration becomes [`UNKNOWN_MEDIA_TYPE`].
fn attachment_media_type(declared: &str) -> String {
    let declared = declared.trim();
    if declared.is_empty() || declared.eq_ignore_ascii_case(NO_MEDIA) {
        UNKNOWN_MEDIA_TYPE.to_string()
    } else {
        declared.to_string()
    }
}

async fn fetch_blob(
    blobs: Arc<dyn BlobStore>,
    limit: Option<Duration>,
    id: ProjectId,
) -> (ProjectId, Option<MediaBlob>) {
    match with_deadline(limit, blobs.get(&id)).await {
        Ok(blob) => (id, blob),
        Err(e) => {
            warn!(id = %id, error = %e, "failed to read media");
            (id, None)
        }
    }
}

/// Await a store call, failing as unavailable if it outlives `limit`.
async fn with_deadline<T, E>(
    limit: Option<Duration>,
    call: impl Future<Output = Result<T, E>>,
) -> CoreResult<T>
where
    CoreError: From<E>,
{
    let Some(limit) = limit else {
        return call.await.map_err(CoreError::from);
    };
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::StorageUnavailable(format!(
            "store did not respond within {} ms",
            limit.as_millis()
        ))),
    }
}
