use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{HandleError, Result};
use crate::handle::{ChildStream, DirectoryHandle, FileHandle, FileMetadata, Handle, WritableSink};
use crate::name;

/// Default buffer size for swap file writes (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Suffix of the sibling file that stages writes until the sink is closed
const SWAP_SUFFIX: &str = ".crswap";

/// Run blocking filesystem work off the async executor
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HandleError::Io(io::Error::other(e)))?
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn not_found_as(err: io::Error, name: &str) -> HandleError {
    if err.kind() == io::ErrorKind::NotFound {
        HandleError::NotFound(name.to_string())
    } else {
        HandleError::Io(err)
    }
}

fn swap_path(target: &Path) -> PathBuf {
    target.with_file_name(format!(".{}{SWAP_SUFFIX}", entry_name(target)))
}

/// Directory handle backed by the local filesystem
///
/// Holds the absolute path of one directory but only ever joins single,
/// validated child names onto it, so a handle can never reach outside the
/// subtree it was granted.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: PathBuf,
    name: String,
}

impl LocalDirectory {
    /// Grant access to an existing directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.canonicalize().map_err(|e| not_found_as(e, &root.to_string_lossy()))?;
        if !path.is_dir() {
            return Err(HandleError::TypeMismatch(path.to_string_lossy().into_owned()));
        }
        Ok(Self {
            name: entry_name(&path),
            path,
        })
    }

    fn child_path(&self, name: &str) -> Result<PathBuf> {
        name::validate(name)?;
        Ok(self.path.join(name))
    }
}

#[async_trait]
impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn children(&self) -> Result<ChildStream> {
        let path = self.path.clone();
        let handles = blocking(move || {
            let mut handles = Vec::new();
            for entry in fs::read_dir(&path)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(SWAP_SUFFIX) {
                    continue;
                }
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    handles.push(Handle::Directory(Arc::new(Self {
                        path: entry.path(),
                        name,
                    })));
                } else if file_type.is_file() {
                    handles.push(Handle::File(Arc::new(LocalFile {
                        path: entry.path(),
                        name,
                    })));
                }
            }
            Ok(handles)
        })
        .await?;
        Ok(stream::iter(handles.into_iter().map(Ok)).boxed())
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryHandle>> {
        let path = self.child_path(name)?;
        let name = name.to_string();
        blocking(move || {
            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => return Err(HandleError::TypeMismatch(name)),
                Err(e) if e.kind() == io::ErrorKind::NotFound && create => {
                    fs::create_dir(&path)?;
                }
                Err(e) => return Err(not_found_as(e, &name)),
            }
            Ok(Arc::new(Self { path, name }) as Arc<dyn DirectoryHandle>)
        })
        .await
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileHandle>> {
        let path = self.child_path(name)?;
        let name = name.to_string();
        blocking(move || {
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return Err(HandleError::TypeMismatch(name)),
                Err(e) if e.kind() == io::ErrorKind::NotFound && create => {
                    File::create(&path)?;
                }
                Err(e) => return Err(not_found_as(e, &name)),
            }
            Ok(Arc::new(LocalFile { path, name }) as Arc<dyn FileHandle>)
        })
        .await
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        let path = self.child_path(name)?;
        let name = name.to_string();
        blocking(move || {
            let meta = fs::metadata(&path).map_err(|e| not_found_as(e, &name))?;
            if !meta.is_dir() {
                fs::remove_file(&path)?;
            } else if recursive {
                fs::remove_dir_all(&path)?;
            } else {
                if fs::read_dir(&path)?.next().is_some() {
                    return Err(HandleError::NotEmpty(name));
                }
                fs::remove_dir(&path)?;
            }
            Ok(())
        })
        .await
    }
}

/// File handle backed by the local filesystem
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn metadata(&self) -> Result<FileMetadata> {
        let path = self.path.clone();
        let name = self.name.clone();
        blocking(move || {
            let meta = fs::metadata(&path).map_err(|e| not_found_as(e, &name))?;
            Ok(FileMetadata {
                mimetype: name::guess_mimetype(&name),
                size: meta.len(),
                last_modified: meta.modified().ok(),
                name,
            })
        })
        .await
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        let path = self.path.clone();
        let name = self.name.clone();
        blocking(move || fs::read(&path).map_err(|e| not_found_as(e, &name))).await
    }

    async fn open_writable(&self) -> Result<Box<dyn WritableSink>> {
        let target = self.path.clone();
        let sink = blocking(move || LocalSink::new(target)).await?;
        Ok(Box::new(sink))
    }
}

/// Stages writes in a swap file next to the target and renames it over the
/// target on close
struct LocalSink {
    target: PathBuf,
    swap: PathBuf,
    writer: Option<Arc<Mutex<BufWriter<File>>>>,
    bytes_written: u64,
}

impl LocalSink {
    fn new(target: PathBuf) -> Result<Self> {
        let swap = swap_path(&target);
        let file = File::create(&swap)?;
        Ok(Self {
            target,
            swap,
            writer: Some(Arc::new(Mutex::new(BufWriter::with_capacity(CHUNK_SIZE, file)))),
            bytes_written: 0,
        })
    }

    fn writer(&self) -> Result<Arc<Mutex<BufWriter<File>>>> {
        self.writer.clone().ok_or_else(|| {
            HandleError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "sink already finished"))
        })
    }
}

#[async_trait]
impl WritableSink for LocalSink {
    async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        let writer = self.writer()?;
        let data = data.to_vec();
        let bytes = data.len() as u64;

        blocking(move || {
            let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
            guard.write_all(&data)?;
            Ok(())
        })
        .await?;

        self.bytes_written += bytes;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let writer = self.writer()?;
        let swap = self.swap.clone();
        let target = self.target.clone();
        blocking(move || {
            writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush()?;
            fs::rename(&swap, &target)?;
            Ok(())
        })
        .await?;
        self.writer = None;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.writer = None;
        self.bytes_written = 0;
        let swap = self.swap.clone();
        blocking(move || match fs::remove_file(&swap) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        })
        .await
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl Drop for LocalSink {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.swap) {
                tracing::debug!(swap = %self.swap.display(), error = %e, "Failed to discard swap file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_blocking_panic_becomes_io_error() {
        let err = blocking(|| -> Result<()> { panic!("worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, HandleError::Io(ref e) if e.kind() == io::ErrorKind::Other));
    }

    #[tokio::test]
    async fn test_sink_commits_on_close() {
        let dir = tempdir().unwrap();
        let root = LocalDirectory::open(dir.path()).unwrap();

        let test_data = b"Hello, handle world!";
        let file = root.get_file("test.txt", true).await.unwrap();
        {
            let mut sink = file.open_writable().await.unwrap();
            sink.write_chunk(test_data).await.unwrap();
            assert_eq!(fs::read(dir.path().join("test.txt")).unwrap(), b"");
            sink.close().await.unwrap();
            assert_eq!(sink.bytes_written(), test_data.len() as u64);
        }

        assert_eq!(file.read_bytes().await.unwrap(), test_data);
        assert!(!dir.path().join(".test.txt.crswap").exists());
    }

    #[tokio::test]
    async fn test_dropped_sink_discards_swap() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), b"original").unwrap();
        let root = LocalDirectory::open(dir.path()).unwrap();

        let file = root.get_file("keep.txt", false).await.unwrap();
        {
            let mut sink = file.open_writable().await.unwrap();
            sink.write_chunk(b"lost").await.unwrap();
        }

        assert_eq!(fs::read(dir.path().join("keep.txt")).unwrap(), b"original");
        assert!(!dir.path().join(".keep.txt.crswap").exists());
    }

    #[tokio::test]
    async fn test_children_and_kinds() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let root = LocalDirectory::open(dir.path()).unwrap();

        let mut children: Vec<Handle> = root.children().await.unwrap().try_collect().await.unwrap();
        children.sort_by(|a, b| a.name().cmp(b.name()));
        assert_eq!(children.len(), 2);
        assert!(!children[0].is_directory());
        assert!(children[1].is_directory());

        let png = root.get_file("a.png", false).await.unwrap();
        assert_eq!(png.metadata().await.unwrap().mimetype, "image/png");
        assert!(matches!(
            root.get_directory("a.png", false).await,
            Err(HandleError::TypeMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tree/nested")).unwrap();
        fs::write(dir.path().join("tree/nested/x.txt"), b"x").unwrap();
        let root = LocalDirectory::open(dir.path()).unwrap();

        assert!(matches!(
            root.remove_entry("tree", false).await,
            Err(HandleError::NotEmpty(_))
        ));
        root.remove_entry("tree", true).await.unwrap();
        assert!(!dir.path().join("tree").exists());
        assert!(root.remove_entry("tree", true).await.unwrap_err().is_not_found());
    }
}
