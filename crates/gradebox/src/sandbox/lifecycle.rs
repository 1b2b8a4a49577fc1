//! Sandbox lifecycle management
//!
//! Manages the creation, use, and teardown of per-evaluation sandbox
//! directories, and bounds how many evaluations run at once.

use std::path::{Component, Path, PathBuf};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::sandbox::SandboxError;

/// A per-evaluation sandbox directory
///
/// Represents a freshly created directory under the sandbox root that holds
/// everything one evaluation stages or produces. Nothing in it is shared
/// across evaluations or retained after the evaluation returns.
///
/// # Cleanup
///
/// Always call [`cleanup()`](Self::cleanup) explicitly before dropping the
/// sandbox. The `Drop` implementation attempts best-effort removal via a
/// spawned thread, but that may not complete before process exit.
#[derive(Debug)]
pub struct Sandbox {
    /// Sandbox ID
    id: u32,

    /// Path to the sandbox directory
    path: PathBuf,

    /// Whether the directory still exists
    active: bool,

    /// Pool permit (if acquired from a pool)
    _permit: Option<OwnedSemaphorePermit>,
}

impl Sandbox {
    /// Create a fresh sandbox directory under `root`.
    ///
    /// A leftover directory with the same id (from a crashed run) is removed
    /// first; every evaluation starts from an empty sandbox.
    #[instrument(skip(root))]
    pub async fn create(id: u32, root: impl Into<PathBuf> + std::fmt::Debug) -> Result<Self, SandboxError> {
        let root = root.into();
        let path = root.join(format!("eval-{id}"));

        if tokio::fs::metadata(&path).await.is_ok() {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|source| SandboxError::CreateFailed { id, source })?;
        }
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| SandboxError::CreateFailed { id, source })?;

        debug!(?path, "sandbox created");

        Ok(Self {
            id,
            path,
            active: true,
            _permit: None,
        })
    }

    /// Get the sandbox ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the path to the sandbox directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the host path to a file inside the sandbox.
    ///
    /// Returns an error if the name contains path traversal attempts; staged
    /// names are sanitized before they get here, this re-checks anyway.
    pub fn file_path(&self, name: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let name = name.as_ref();
        if name.is_absolute()
            || name
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(SandboxError::InvalidPath(format!(
                "path traversal not allowed: {}",
                name.display()
            )));
        }
        Ok(self.path.join(name))
    }

    /// Write a file into the sandbox
    #[instrument(skip(self, content))]
    pub async fn write_file(
        &self,
        name: impl AsRef<Path> + std::fmt::Debug,
        content: &[u8],
    ) -> Result<PathBuf, SandboxError> {
        let path = self.file_path(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content).await?;
        debug!(?path, len = content.len(), "wrote file to sandbox");
        Ok(path)
    }

    /// Read a file from the sandbox
    pub async fn read_file(&self, name: impl AsRef<Path>) -> Result<Vec<u8>, SandboxError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::read(&path).await?)
    }

    /// Read a file from the sandbox as lossy UTF-8, empty if absent
    pub async fn read_log(&self, name: impl AsRef<Path>) -> Result<String, SandboxError> {
        let path = self.file_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in the sandbox
    pub async fn file_exists(&self, name: impl AsRef<Path>) -> Result<bool, SandboxError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Create a directory inside the sandbox and return its host path
    pub async fn create_dir(&self, name: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let path = self.file_path(name)?;
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Remove the sandbox directory.
    ///
    /// This must be called on every exit path; the return value indicates
    /// whether removal succeeded and should be checked.
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self))]
    pub async fn cleanup(&mut self) -> Result<(), SandboxError> {
        if !self.active {
            return Ok(());
        }

        tokio::fs::remove_dir_all(&self.path)
            .await
            .map_err(|source| SandboxError::CleanupFailed {
                id: self.id,
                source,
            })?;

        self.active = false;
        debug!(id = self.id, "sandbox removed");
        Ok(())
    }

    /// Attach a pool permit to this sandbox
    pub(crate) fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }

    /// Check if the sandbox directory still exists (not yet cleaned up)
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.active {
            warn!(
                id = self.id,
                path = %self.path.display(),
                "Sandbox dropped without explicit cleanup! \
                 Call cleanup() before dropping to release sandbox resources. \
                 Attempting best-effort removal via spawned thread (may not complete)."
            );

            let path = self.path.clone();
            let id = self.id;
            std::thread::spawn(move || match std::fs::remove_dir_all(&path) {
                Ok(()) => debug!(id, "best-effort sandbox removal succeeded"),
                Err(e) => warn!(id, error = %e, "best-effort sandbox removal failed"),
            });
        }
    }
}

/// Pool of sandboxes bounding concurrent evaluations
///
/// Sandbox ids wrap modulo the pool size; the semaphore guarantees no two
/// live evaluations share an id, so no two share a directory.
#[derive(Debug)]
pub struct SandboxPool {
    /// Root directory for all sandboxes
    root: PathBuf,

    /// Number of concurrent sandboxes
    slots: u32,

    /// Semaphore limiting concurrent sandboxes
    semaphore: std::sync::Arc<Semaphore>,

    /// Next sandbox ID to use (wraps around)
    next_id: std::sync::atomic::AtomicU32,
}

impl SandboxPool {
    /// Create a new sandbox pool
    pub fn new(root: impl Into<PathBuf>, slots: u32) -> Self {
        Self {
            root: root.into(),
            slots: slots.max(1),
            semaphore: std::sync::Arc::new(Semaphore::new(slots.max(1) as usize)),
            next_id: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Acquire a fresh sandbox, waiting for a free slot
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<Sandbox, SandboxError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SandboxError::PoolClosed)?;

        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            % self.slots;

        debug!(id, "acquired sandbox slot");

        let sandbox = Sandbox::create(id, &self.root).await?;
        Ok(sandbox.with_permit(permit))
    }

    /// Get the number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the total number of slots in the pool
    pub fn capacity(&self) -> u32 {
        self.slots
    }
}
