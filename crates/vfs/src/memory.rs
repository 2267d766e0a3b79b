//! In-memory handle tree
//!
//! Provides a fast, ephemeral tree that exists only in memory.
//! Useful for unit tests that need handle operations without disk I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{HandleError, Result};
use crate::handle::{ChildStream, DirectoryHandle, FileHandle, FileMetadata, Handle, WritableSink};
use crate::name;

struct FileNode {
    name: String,
    data: RwLock<Vec<u8>>,
    modified: RwLock<SystemTime>,
}

struct DirNode {
    name: String,
    children: RwLock<BTreeMap<String, Node>>,
}

#[derive(Clone)]
enum Node {
    File(Arc<FileNode>),
    Directory(Arc<DirNode>),
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl FileNode {
    fn new(name: &str, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            data: RwLock::new(data),
            modified: RwLock::new(SystemTime::now()),
        })
    }
}

impl DirNode {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            children: RwLock::new(BTreeMap::new()),
        })
    }
}

impl Node {
    fn into_handle(self) -> Handle {
        match self {
            Self::File(node) => Handle::File(Arc::new(MemoryFile { node })),
            Self::Directory(node) => Handle::Directory(Arc::new(MemoryDirectory { node })),
        }
    }
}

/// In-memory directory handle
///
/// Cloning yields another handle onto the same directory.
/// Thread-safe via internal `RwLock`s.
#[derive(Clone)]
pub struct MemoryDirectory {
    node: Arc<DirNode>,
}

impl MemoryDirectory {
    /// Create a new empty tree rooted at a directory called `name`
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            node: DirNode::new(name.as_ref()),
        }
    }

    /// Create with initial file contents, keyed by slash-separated path
    ///
    /// Intermediate directories are created as needed. A path ending in `/`
    /// creates an empty directory instead of a file.
    pub fn with_files<C: AsRef<[u8]>>(files: Vec<(&str, C)>) -> Self {
        let root = Self::new("root");
        for (path, content) in files {
            let parts: Vec<&str> = path.split('/').collect();
            let Some((last, parents)) = parts.split_last() else {
                continue;
            };
            let mut current = root.node.clone();
            for part in parents.iter().filter(|p| !p.is_empty()) {
                current = Self::child_dir_node(&current, part);
            }
            if !last.is_empty() {
                let file = FileNode::new(last, content.as_ref().to_vec());
                write(&current.children).insert((*last).to_string(), Node::File(file));
            }
        }
        root
    }

    fn child_dir_node(parent: &Arc<DirNode>, name: &str) -> Arc<DirNode> {
        let mut children = write(&parent.children);
        match children.get(name) {
            Some(Node::Directory(dir)) => dir.clone(),
            _ => {
                let dir = DirNode::new(name);
                children.insert(name.to_string(), Node::Directory(dir.clone()));
                dir
            }
        }
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.node.name
    }

    async fn children(&self) -> Result<ChildStream> {
        // Snapshot taken now; later mutations are not observed by this stream
        let snapshot: Vec<Handle> = read(&self.node.children)
            .values()
            .cloned()
            .map(Node::into_handle)
            .collect();
        Ok(stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryHandle>> {
        name::validate(name)?;
        let mut children = write(&self.node.children);
        match children.get(name) {
            Some(Node::Directory(node)) => Ok(Arc::new(Self { node: node.clone() })),
            Some(Node::File(_)) => Err(HandleError::TypeMismatch(name.to_string())),
            None if create => {
                let node = DirNode::new(name);
                children.insert(name.to_string(), Node::Directory(node.clone()));
                Ok(Arc::new(Self { node }))
            }
            None => Err(HandleError::NotFound(name.to_string())),
        }
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileHandle>> {
        name::validate(name)?;
        let mut children = write(&self.node.children);
        match children.get(name) {
            Some(Node::File(node)) => Ok(Arc::new(MemoryFile { node: node.clone() })),
            Some(Node::Directory(_)) => Err(HandleError::TypeMismatch(name.to_string())),
            None if create => {
                let node = FileNode::new(name, Vec::new());
                children.insert(name.to_string(), Node::File(node.clone()));
                Ok(Arc::new(MemoryFile { node }))
            }
            None => Err(HandleError::NotFound(name.to_string())),
        }
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        name::validate(name)?;
        let mut children = write(&self.node.children);
        match children.get(name) {
            None => return Err(HandleError::NotFound(name.to_string())),
            Some(Node::Directory(dir)) if !recursive && !read(&dir.children).is_empty() => {
                return Err(HandleError::NotEmpty(name.to_string()));
            }
            Some(_) => {}
        }
        children.remove(name);
        Ok(())
    }
}

/// In-memory file handle
pub struct MemoryFile {
    node: Arc<FileNode>,
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.node.name
    }

    async fn metadata(&self) -> Result<FileMetadata> {
        Ok(FileMetadata {
            name: self.node.name.clone(),
            mimetype: name::guess_mimetype(&self.node.name),
            size: read(&self.node.data).len() as u64,
            last_modified: Some(*read(&self.node.modified)),
        })
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(read(&self.node.data).clone())
    }

    async fn open_writable(&self) -> Result<Box<dyn WritableSink>> {
        Ok(Box::new(MemorySink {
            node: self.node.clone(),
            buffer: Vec::new(),
        }))
    }
}

/// Buffers writes until closed
struct MemorySink {
    node: Arc<FileNode>,
    buffer: Vec<u8>,
}

#[async_trait]
impl WritableSink for MemorySink {
    async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        *write(&self.node.data) = std::mem::take(&mut self.buffer);
        *write(&self.node.modified) = SystemTime::now();
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.buffer.clear();
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.buffer.len() as u64
    }
}
