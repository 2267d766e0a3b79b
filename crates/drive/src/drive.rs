//! Content-service drive over a granted root directory
//!
//! Every operation resolves its paths from the root handle afresh; no handle
//! other than the root outlives a call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use fsaccess_protocol::{
    ChangeEvent, CheckpointModel, ContentModel, ContentType, CreateOptions, Format, GetOptions,
    SaveOptions,
};
use fsaccess_vfs::{DirectoryHandle, Handle};
use tokio::sync::broadcast;

use crate::config::DriveConfig;
use crate::error::{DriveError, Result};
use crate::events::ChangeBus;
use crate::{lookup, model, path, tree};

/// Identity reported for the single checkpoint every file appears to have
pub const CHECKPOINT_ID: &str = "checkpoint";

const METADATA_ONLY: GetOptions = GetOptions {
    content: false,
    format: None,
};

/// Drive implementing the content-service contract
pub struct Drive {
    config: DriveConfig,
    /// Replaced wholesale on every grant; calls clone it once at start
    root: RwLock<Option<Arc<dyn DirectoryHandle>>>,
    events: ChangeBus,
    disposed: AtomicBool,
}

impl Default for Drive {
    fn default() -> Self {
        Self::new(DriveConfig::default())
    }
}

impl Drive {
    /// Create a drive with no root granted yet
    pub fn new(config: DriveConfig) -> Self {
        let events = ChangeBus::new(config.event_capacity);
        Self {
            config,
            root: RwLock::new(None),
            events,
            disposed: AtomicBool::new(false),
        }
    }

    /// Create a drive over an already granted root
    pub fn with_root(config: DriveConfig, root: Arc<dyn DirectoryHandle>) -> Self {
        let drive = Self::new(config);
        drive.set_root(Some(root));
        drive
    }

    pub fn name(&self) -> &str {
        &self.config.drive_name
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Root grant
    // ─────────────────────────────────────────────────────────────────────────

    pub fn root(&self) -> Option<Arc<dyn DirectoryHandle>> {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the root; returns the previous one
    ///
    /// Operations already in flight keep working against the root they
    /// started with.
    pub fn set_root(&self, root: Option<Arc<dyn DirectoryHandle>>) -> Option<Arc<dyn DirectoryHandle>> {
        match &root {
            Some(handle) => tracing::info!(drive = %self.name(), root = handle.name(), "Root directory granted"),
            None => tracing::info!(drive = %self.name(), "Root directory cleared"),
        }
        let mut slot = self.root.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, root)
    }

    fn require_root(&self) -> Result<Arc<dyn DirectoryHandle>> {
        self.root().ok_or(DriveError::NoRootEstablished)
    }

    fn normalize(&self, path: &str) -> Result<String> {
        path::normalize(path, &self.config.drive_name)
    }

    fn normalize_entry(&self, path: &str) -> Result<String> {
        let normalized = self.normalize(path)?;
        if normalized.is_empty() {
            return Err(DriveError::InvalidPath(path.to_string()));
        }
        Ok(normalized)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Change notifications and lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Close the change stream; idempotent
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.events.close();
        tracing::debug!(drive = %self.name(), "Drive disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the model at `path`
    ///
    /// Before a root is granted this yields an empty root listing instead of
    /// failing.
    #[tracing::instrument(skip(self, options), level = "debug")]
    pub async fn get(&self, path: &str, options: GetOptions) -> Result<ContentModel> {
        let Some(root) = self.root() else {
            return Ok(model::empty_root());
        };
        let path = self.normalize(path)?;
        let handle = path::resolve_entry(&root, &path).await?;
        model::build(&handle, &path, options, self.config.listing_includes_content).await
    }

    /// Create a directory or write a file, creating missing parents
    ///
    /// The returned model is re-read from the backend after writing.
    #[tracing::instrument(skip(self, options), level = "debug")]
    pub async fn save(&self, path: &str, options: SaveOptions) -> Result<ContentModel> {
        let root = self.require_root()?;
        let path = self.normalize_entry(path)?;
        let content_type = options.content_type.unwrap_or(ContentType::File);

        // Validate the payload before anything is created
        let data = match content_type {
            ContentType::File => {
                model::encode_content(&path, options.format, options.content.as_ref())?
            }
            ContentType::Directory => None,
        };
        let needs_payload = content_type == ContentType::File
            && data.is_none()
            && options.format == Some(Format::Json);
        let missing_payload = |path: &str| DriveError::InvalidContent {
            path: path.to_string(),
            reason: "a new structured file needs content".to_string(),
        };

        let (parent, name) = match path::resolve_parent(&root, &path, false).await {
            Ok(found) => found,
            Err(e) if e.is_not_found() && needs_payload => return Err(missing_payload(&path)),
            Err(e) if e.is_not_found() => path::resolve_parent(&root, &path, true).await?,
            Err(e) => return Err(e),
        };
        let existing = lookup::lookup(parent.as_ref(), name).await?;
        match &existing {
            Some(entry) if entry.is_directory() != (content_type == ContentType::Directory) => {
                return Err(DriveError::AlreadyExists(path));
            }
            None if needs_payload => return Err(missing_payload(&path)),
            _ => {}
        }

        let model = match content_type {
            ContentType::Directory => {
                let dir = parent
                    .get_directory(name, true)
                    .await
                    .map_err(|e| DriveError::at(e, &path))?;
                model::build_directory_listing(
                    dir.as_ref(),
                    &path,
                    self.config.listing_includes_content,
                )
                .await?
            }
            ContentType::File => {
                let file = parent
                    .get_file(name, true)
                    .await
                    .map_err(|e| DriveError::at(e, &path))?;
                if let Some(data) = data {
                    tree::write_all(file.as_ref(), &data).await?;
                }
                let (parent_path, _) = path::split(&path);
                model::build_file(file.as_ref(), parent_path, true, options.format).await?
            }
        };

        let summary = ContentModel {
            content: None,
            ..model.clone()
        };
        if existing.is_none() {
            tracing::info!(path = %path, kind = ?content_type, "Created entry");
            self.events.created(summary);
        } else if content_type == ContentType::File {
            tracing::info!(path = %path, "Saved file");
            self.events.saved(summary);
        }
        Ok(model)
    }

    /// Remove the entry at `path`, recursively for directories
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn delete(&self, path: &str) -> Result<()> {
        let root = self.require_root()?;
        let path = self.normalize_entry(path)?;

        let (parent, name) = path::resolve_parent(&root, &path, false).await?;
        let entry = lookup::find(parent.as_ref(), name, &path).await?;
        let old = model::build(&entry, &path, METADATA_ONLY, false).await?;

        tree::remove(parent.as_ref(), &entry).await?;
        tracing::info!(path = %path, "Deleted entry");
        self.events.deleted(old);
        Ok(())
    }

    /// Move an entry by copying it to `new_path` and deleting the original
    ///
    /// Not atomic. If the copy fails partway the partial destination stays
    /// behind; if removing the source fails both entries remain and
    /// [`DriveError::PartialRename`] is returned.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<ContentModel> {
        let root = self.require_root()?;
        let from = self.normalize_entry(old_path)?;
        let to = self.normalize_entry(new_path)?;
        if from == to {
            return self.get(&to, METADATA_ONLY).await;
        }
        if path::is_within(&to, &from) {
            return Err(DriveError::InvalidPath(new_path.to_string()));
        }

        let (src_parent, src_name) = path::resolve_parent(&root, &from, false).await?;
        let source = lookup::find(src_parent.as_ref(), src_name, &from).await?;
        let (dst_parent, dst_name) = path::resolve_parent(&root, &to, false).await?;
        if lookup::exists(dst_parent.as_ref(), dst_name).await? {
            return Err(DriveError::AlreadyExists(to));
        }

        let old = model::build(&source, &from, METADATA_ONLY, false).await?;
        let copy = tree::copy_entry(&source, dst_parent.as_ref(), dst_name).await?;

        if let Err(e) = tree::remove(src_parent.as_ref(), &source).await {
            tracing::warn!(from = %from, to = %to, error = %e, "Rename left source in place");
            return Err(DriveError::PartialRename {
                from,
                to,
                source: Box::new(e),
            });
        }

        let new = model::build(&copy, &to, METADATA_ONLY, false).await?;
        tracing::info!(from = %from, to = %to, "Renamed entry");
        self.events.renamed(old, new.clone());
        Ok(new)
    }

    /// Copy the entry at `path` into the directory `to_dir`
    ///
    /// A name already taken in `to_dir` gets the configured copy suffix.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn copy(&self, path: &str, to_dir: &str) -> Result<ContentModel> {
        let root = self.require_root()?;
        let from = self.normalize_entry(path)?;
        let dest_path = self.normalize(to_dir)?;
        if path::is_within(&dest_path, &from) {
            return Err(DriveError::InvalidPath(to_dir.to_string()));
        }

        let (src_parent, src_name) = path::resolve_parent(&root, &from, false).await?;
        let source = lookup::find(src_parent.as_ref(), src_name, &from).await?;
        let dest = path::resolve_directory(&root, &dest_path, false).await?;

        let taken = lookup::child_names(dest.as_ref()).await?;
        let name = tree::copy_name(src_name, source.kind(), &self.config.copy_suffix, &taken);
        let copy = tree::copy_entry(&source, dest.as_ref(), &name).await?;

        let model = model::build(&copy, &path::join(&dest_path, &name), METADATA_ONLY, false).await?;
        tracing::info!(from = %from, to = %model.path, "Copied entry");
        self.events.created(model.clone());
        Ok(model)
    }

    /// Create a file or directory under a free "untitled" name
    #[tracing::instrument(skip(self, options), fields(dir = %options.path), level = "debug")]
    pub async fn new_untitled(&self, options: CreateOptions) -> Result<ContentModel> {
        let root = self.require_root()?;
        let dir_path = self.normalize(&options.path)?;
        let dir = path::resolve_directory(&root, &dir_path, true).await?;
        let taken = lookup::child_names(dir.as_ref()).await?;

        let (name, handle) = match options.content_type {
            ContentType::Directory => {
                let name = tree::untitled_name(&self.config.untitled_folder, " ", "", &taken);
                let created = dir.get_directory(&name, true).await?;
                (name, Handle::Directory(created))
            }
            ContentType::File => {
                let ext = options
                    .ext
                    .as_deref()
                    .unwrap_or(&self.config.default_extension);
                let ext = tree::dotted_extension(ext);
                let name = tree::untitled_name(&self.config.untitled_file, "", &ext, &taken);
                let created = dir.get_file(&name, true).await?;
                (name, Handle::File(created))
            }
        };

        let model = model::build(&handle, &path::join(&dir_path, &name), METADATA_ONLY, false).await?;
        tracing::info!(path = %model.path, "Created untitled entry");
        self.events.created(model.clone());
        Ok(model)
    }

    /// Download URLs need a server to hand them out; this drive has none
    pub fn get_download_url(&self, path: &str) -> Result<String> {
        tracing::debug!(path, "Download URL requested");
        Err(DriveError::NotImplemented("get_download_url"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkpoints (the backend has no versioning; these never touch storage)
    // ─────────────────────────────────────────────────────────────────────────

    fn checkpoint() -> CheckpointModel {
        CheckpointModel {
            id: CHECKPOINT_ID.to_string(),
            last_modified: model::timestamp(Some(SystemTime::now())),
        }
    }

    pub fn create_checkpoint(&self, _path: &str) -> CheckpointModel {
        Self::checkpoint()
    }

    pub fn list_checkpoints(&self, _path: &str) -> Vec<CheckpointModel> {
        vec![Self::checkpoint()]
    }

    pub fn restore_checkpoint(&self, path: &str, checkpoint_id: &str) {
        tracing::debug!(path, checkpoint_id, "Checkpoint restore ignored");
    }

    pub fn delete_checkpoint(&self, path: &str, checkpoint_id: &str) {
        tracing::debug!(path, checkpoint_id, "Checkpoint delete ignored");
    }
}

#[cfg(test)]
mod tests {
    use fsaccess_vfs::MemoryDirectory;

    use super::*;

    fn memory_root() -> Arc<dyn DirectoryHandle> {
        Arc::new(MemoryDirectory::with_files(vec![("a.txt", b"A")]))
    }

    #[tokio::test]
    async fn test_set_root_replaces_previous() {
        let drive = Drive::default();
        assert!(drive.root().is_none());
        assert!(drive.set_root(Some(memory_root())).is_none());

        let previous = drive.set_root(Some(Arc::new(MemoryDirectory::new("other"))));
        assert_eq!(previous.unwrap().name(), "root");
        assert_eq!(drive.root().unwrap().name(), "other");

        assert!(drive.set_root(None).is_some());
        assert!(matches!(
            drive.delete("a.txt").await,
            Err(DriveError::NoRootEstablished)
        ));
    }

    #[tokio::test]
    async fn test_root_path_is_not_an_entry() {
        let drive = Drive::with_root(DriveConfig::default(), memory_root());
        assert!(matches!(drive.delete("/").await, Err(DriveError::InvalidPath(_))));
        assert!(matches!(
            drive.save("FileSystem:", SaveOptions::directory()).await,
            Err(DriveError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_onto_itself_is_a_no_op() {
        let drive = Drive::with_root(DriveConfig::default(), memory_root());
        let mut rx = drive.subscribe();

        let model = drive.rename("a.txt", "/a.txt").await.unwrap();
        assert_eq!(model.path, "a.txt");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let drive = Drive::default();
        assert!(!drive.is_disposed());
        drive.dispose();
        drive.dispose();
        assert!(drive.is_disposed());
    }
}
