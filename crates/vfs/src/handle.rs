use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Discriminant carried by every handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    File,
    Directory,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// Metadata reported by a file handle
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub name: String,
    /// Mimetype as reported by the backend; empty when unknown
    pub mimetype: String,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
}

/// Lazy, one-shot sequence of a directory's children.
///
/// Once polled to completion it cannot be restarted; call
/// [`DirectoryHandle::children`] again for a fresh enumeration.
pub type ChildStream = BoxStream<'static, Result<Handle>>;

/// Scoped writable sink opened on a file
///
/// Writes become visible only once `close` succeeds. A sink that is aborted
/// or dropped without being closed persists nothing.
#[async_trait]
pub trait WritableSink: Send {
    /// Append a chunk of data
    async fn write_chunk(&mut self, data: &[u8]) -> Result<()>;

    /// Commit everything written so far, replacing the file's contents
    async fn close(&mut self) -> Result<()>;

    /// Discard everything written so far
    async fn abort(&mut self) -> Result<()>;

    /// Bytes written so far
    fn bytes_written(&self) -> u64;
}

/// Handle to a file in the backing store
#[async_trait]
pub trait FileHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn metadata(&self) -> Result<FileMetadata>;

    /// Read entire file contents
    async fn read_bytes(&self) -> Result<Vec<u8>>;

    /// Read entire file contents as text, replacing invalid UTF-8
    async fn read_text(&self) -> Result<String> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Open a sink that replaces the file's contents when closed
    async fn open_writable(&self) -> Result<Box<dyn WritableSink>>;
}

/// Handle to a directory in the backing store
///
/// The only way to reach an entry below this directory is through one of
/// these methods.
#[async_trait]
pub trait DirectoryHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Enumerate immediate children
    async fn children(&self) -> Result<ChildStream>;

    /// Open (or create) the named child directory
    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryHandle>>;

    /// Open (or create as an empty file) the named child file
    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileHandle>>;

    /// Remove the named child; directories with children require `recursive`
    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()>;
}

/// A handle to either kind of entry
#[derive(Clone)]
pub enum Handle {
    File(Arc<dyn FileHandle>),
    Directory(Arc<dyn DirectoryHandle>),
}

impl Handle {
    pub const fn kind(&self) -> HandleKind {
        match self {
            Self::File(_) => HandleKind::File,
            Self::Directory(_) => HandleKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => file.name(),
            Self::Directory(dir) => dir.name(),
        }
    }

    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
