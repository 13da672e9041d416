use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::fs;

use crate::error::{SessionError, SessionResult};

const ACTIVE_MARKER: &str = "active";

/// Durable boolean marker recording that guest mode is active.
#[async_trait]
pub trait GuestFlag: Send + Sync {
    async fn is_set(&self) -> SessionResult<bool>;
    async fn set(&self) -> SessionResult<()>;
    async fn clear(&self) -> SessionResult<()>;
}

/// Process-local flag for tests.
#[derive(Debug, Default)]
pub struct InMemoryGuestFlag {
    active: AtomicBool,
}

impl InMemoryGuestFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that starts out set, as if left behind by an earlier run.
    pub fn preset() -> Self {
        Self {
            active: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl GuestFlag for InMemoryGuestFlag {
    async fn is_set(&self) -> SessionResult<bool> {
        Ok(self.active.load(Ordering::SeqCst))
    }

    async fn set(&self) -> SessionResult<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Flag persisted as a small marker file; survives process restarts.
#[derive(Clone, Debug)]
pub struct FsGuestFlag {
    path: PathBuf,
}

impl FsGuestFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn flag_err(path: &Path, e: std::io::Error) -> SessionError {
    SessionError::GuestFlag(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl GuestFlag for FsGuestFlag {
    async fn is_set(&self) -> SessionResult<bool> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents.trim() == ACTIVE_MARKER),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(flag_err(&self.path, e)),
        }
    }

    async fn set(&self) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| flag_err(&self.path, e))?;
        }
        fs::write(&self.path, ACTIVE_MARKER)
            .await
            .map_err(|e| flag_err(&self.path, e))
    }

    async fn clear(&self) -> SessionResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(flag_err(&self.path, e)),
        }
    }
}
