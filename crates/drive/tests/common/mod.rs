//! Common test utilities
#![allow(dead_code)] // Not every helper is used by every test file

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fsaccess_drive::{ChangeEvent, Drive, DriveConfig};
use fsaccess_vfs::{
    ChildStream, DirectoryHandle, FileHandle, HandleError, MemoryDirectory, Result,
};
use tokio::sync::{broadcast, Notify};

/// Drive over an in-memory tree seeded with `files`
///
/// Returns the raw tree too so tests can inspect it without going through
/// the drive.
pub fn memory_drive<C: AsRef<[u8]>>(files: Vec<(&str, C)>) -> (Drive, MemoryDirectory) {
    let tree = MemoryDirectory::with_files(files);
    let drive = Drive::with_root(DriveConfig::default(), Arc::new(tree.clone()));
    (drive, tree)
}

/// Every event already queued on `rx`
pub fn drain(rx: &mut broadcast::Receiver<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Directory wrapper whose removals always fail
///
/// Subdirectories opened through it are wrapped as well; file access and
/// enumeration pass straight through.
pub struct NoRemoveDirectory {
    inner: Arc<dyn DirectoryHandle>,
}

impl NoRemoveDirectory {
    pub fn wrap(inner: Arc<dyn DirectoryHandle>) -> Arc<dyn DirectoryHandle> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl DirectoryHandle for NoRemoveDirectory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn children(&self) -> Result<ChildStream> {
        self.inner.children().await
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryHandle>> {
        let dir = self.inner.get_directory(name, create).await?;
        Ok(Self::wrap(dir))
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileHandle>> {
        self.inner.get_file(name, create).await
    }

    async fn remove_entry(&self, name: &str, _recursive: bool) -> Result<()> {
        Err(refused(format!("removal of {name} refused")))
    }
}

fn refused(what: String) -> HandleError {
    HandleError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, what))
}

/// Lets a test pause a call inside `children()`
#[derive(Default)]
pub struct Gate {
    /// Signalled when a call reaches the gate
    pub entered: Notify,
    /// Signal to let the waiting call continue
    pub release: Notify,
}

/// Directory wrapper whose child enumeration waits on a [`Gate`]
pub struct GatedDirectory {
    inner: Arc<dyn DirectoryHandle>,
    gate: Arc<Gate>,
}

impl GatedDirectory {
    pub fn wrap(inner: Arc<dyn DirectoryHandle>, gate: Arc<Gate>) -> Arc<dyn DirectoryHandle> {
        Arc::new(Self { inner, gate })
    }
}

#[async_trait]
impl DirectoryHandle for GatedDirectory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn children(&self) -> Result<ChildStream> {
        self.gate.entered.notify_one();
        self.gate.release.notified().await;
        self.inner.children().await
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryHandle>> {
        self.inner.get_directory(name, create).await
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileHandle>> {
        self.inner.get_file(name, create).await
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        self.inner.remove_entry(name, recursive).await
    }
}

/// Directory wrapper that allows a fixed number of file creations
///
/// Every `get_file(.., true)` below the wrapped root spends one unit of a
/// shared budget; once it is spent, creation fails.
pub struct LimitedDirectory {
    inner: Arc<dyn DirectoryHandle>,
    budget: Arc<AtomicUsize>,
}

impl LimitedDirectory {
    pub fn wrap(inner: Arc<dyn DirectoryHandle>, files: usize) -> Arc<dyn DirectoryHandle> {
        Arc::new(Self {
            inner,
            budget: Arc::new(AtomicUsize::new(files)),
        })
    }
}

#[async_trait]
impl DirectoryHandle for LimitedDirectory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn children(&self) -> Result<ChildStream> {
        self.inner.children().await
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryHandle>> {
        let dir = self.inner.get_directory(name, create).await?;
        Ok(Arc::new(Self {
            inner: dir,
            budget: self.budget.clone(),
        }))
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileHandle>> {
        if create
            && self
                .budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
        {
            return Err(refused(format!("creation of {name} refused")));
        }
        self.inner.get_file(name, create).await
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        self.inner.remove_entry(name, recursive).await
    }
}
