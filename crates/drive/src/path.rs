//! Logical path handling and resolution over a handle tree
//!
//! The backing store has no path API, so every path is resolved per call by
//! walking from the root one child directory at a time.

use std::sync::Arc;

use fsaccess_vfs::{DirectoryHandle, Handle};

use crate::error::{DriveError, Result};
use crate::lookup;

/// Strip an optional `drive:` prefix and normalize separators
///
/// Leading, trailing and repeated slashes are dropped. `.` and `..` segments
/// are rejected: handles can only be walked downwards.
pub fn normalize(path: &str, drive_name: &str) -> Result<String> {
    let local = path
        .strip_prefix(drive_name)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(path);

    let mut segments = Vec::new();
    for segment in local.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(DriveError::InvalidPath(path.to_string()));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Split a normalized path into its parent path and final component
pub fn split(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

/// Join a normalized parent path and a child name
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Whether `path` is `ancestor` itself or lies below it
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Walk every segment of a normalized directory path starting at `root`
///
/// With `create`, missing directories are created along the way; otherwise a
/// missing or non-directory segment fails with `NotFound`.
pub async fn resolve_directory(
    root: &Arc<dyn DirectoryHandle>,
    path: &str,
    create: bool,
) -> Result<Arc<dyn DirectoryHandle>> {
    let mut current = root.clone();
    let mut walked = String::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        walked = join(&walked, segment);
        current = if create {
            current
                .get_directory(segment, true)
                .await
                .map_err(|e| DriveError::at(e, &walked))?
        } else {
            match lookup::find(current.as_ref(), segment, &walked).await? {
                Handle::Directory(dir) => dir,
                Handle::File(_) => return Err(DriveError::NotFound(walked)),
            }
        };
    }

    tracing::debug!(path, create, "Resolved directory");
    Ok(current)
}

/// Resolve the directory that contains the entry at `path`
///
/// Returns the parent handle together with the entry's own name. A top-level
/// path resolves to `root` itself.
pub async fn resolve_parent<'p>(
    root: &Arc<dyn DirectoryHandle>,
    path: &'p str,
    create: bool,
) -> Result<(Arc<dyn DirectoryHandle>, &'p str)> {
    let (parent, name) = split(path);
    if name.is_empty() {
        return Err(DriveError::InvalidPath(path.to_string()));
    }
    let dir = resolve_directory(root, parent, create).await?;
    Ok((dir, name))
}

/// Resolve the entry at a normalized path; the empty path is the root itself
pub async fn resolve_entry(root: &Arc<dyn DirectoryHandle>, path: &str) -> Result<Handle> {
    if path.is_empty() {
        return Ok(Handle::Directory(root.clone()));
    }
    let (parent, name) = resolve_parent(root, path, false).await?;
    lookup::find(parent.as_ref(), name, path).await
}
