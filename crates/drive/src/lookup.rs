//! Name lookups against a directory's child enumeration
//!
//! Children arrive as a one-shot stream. Each lookup buffers it into a vector
//! for the duration of that call only; nothing is kept between calls.

use std::collections::HashSet;

use fsaccess_vfs::{DirectoryHandle, Handle};
use futures::TryStreamExt;

use crate::error::{DriveError, Result};

/// Materialize the immediate children of `dir`
pub async fn children(dir: &dyn DirectoryHandle) -> Result<Vec<Handle>> {
    let stream = dir.children().await?;
    let handles: Vec<Handle> = stream.try_collect().await?;
    Ok(handles)
}

/// Names of the immediate children of `dir`
pub async fn child_names(dir: &dyn DirectoryHandle) -> Result<HashSet<String>> {
    Ok(children(dir)
        .await?
        .iter()
        .map(|handle| handle.name().to_string())
        .collect())
}

/// Find the child called `name`, if any
pub async fn lookup(dir: &dyn DirectoryHandle, name: &str) -> Result<Option<Handle>> {
    Ok(children(dir)
        .await?
        .into_iter()
        .find(|handle| handle.name() == name))
}

/// Find the child called `name`, failing with `NotFound(path)` when absent
pub async fn find(dir: &dyn DirectoryHandle, name: &str, path: &str) -> Result<Handle> {
    lookup(dir, name)
        .await?
        .ok_or_else(|| DriveError::NotFound(path.to_string()))
}

/// Whether a child called `name` exists
pub async fn exists(dir: &dyn DirectoryHandle, name: &str) -> Result<bool> {
    Ok(lookup(dir, name).await?.is_some())
}
