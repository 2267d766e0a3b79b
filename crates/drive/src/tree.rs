//! Copy, removal and naming over a handle tree
//!
//! The backend offers no move, rename or copy primitive. Trees are copied by
//! recreating every directory and rewriting every file's bytes; a rename is a
//! copy followed by a delete. Nothing here rolls back a partial copy.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fsaccess_vfs::{DirectoryHandle, FileHandle, Handle, HandleKind};

use crate::error::Result;
use crate::lookup;

type BoxedCopy<'a> = Pin<Box<dyn Future<Output = Result<Handle>> + Send + 'a>>;

/// Replace a file's contents through a scoped sink
///
/// The sink is always finished: closed on success, aborted when a write fails.
pub async fn write_all(file: &dyn FileHandle, data: &[u8]) -> Result<()> {
    let mut sink = file.open_writable().await?;
    if let Err(e) = sink.write_chunk(data).await {
        if let Err(abort_err) = sink.abort().await {
            tracing::warn!(file = file.name(), error = %abort_err, "Failed to abort writable sink");
        }
        return Err(e.into());
    }
    sink.close().await?;
    Ok(())
}

/// Copy a file's bytes into a new file called `name` inside `dest`
pub async fn copy_file(
    file: &dyn FileHandle,
    dest: &dyn DirectoryHandle,
    name: &str,
) -> Result<Arc<dyn FileHandle>> {
    let data = file.read_bytes().await?;
    let copy = dest.get_file(name, true).await?;
    write_all(copy.as_ref(), &data).await?;
    Ok(copy)
}

/// Recreate `source` (file or whole directory tree) as `name` inside `dest`
pub fn copy_entry<'a>(
    source: &'a Handle,
    dest: &'a dyn DirectoryHandle,
    name: &'a str,
) -> BoxedCopy<'a> {
    Box::pin(async move {
        match source {
            Handle::File(file) => {
                let copy = copy_file(file.as_ref(), dest, name).await?;
                tracing::debug!(kind = %source.kind(), from = file.name(), to = name, "Copied entry");
                Ok(Handle::File(copy))
            }
            Handle::Directory(dir) => {
                // Enumerate before creating the destination so the new
                // directory is not copied into itself
                let children = lookup::children(dir.as_ref()).await?;
                let copy = dest.get_directory(name, true).await?;
                for child in &children {
                    copy_entry(child, copy.as_ref(), child.name()).await?;
                }
                tracing::debug!(
                    kind = %source.kind(),
                    from = dir.name(),
                    to = name,
                    entries = children.len(),
                    "Copied entry"
                );
                Ok(Handle::Directory(copy))
            }
        }
    })
}

/// Remove the named entry, recursing into directories
pub async fn remove(parent: &dyn DirectoryHandle, entry: &Handle) -> Result<()> {
    parent
        .remove_entry(entry.name(), entry.is_directory())
        .await?;
    Ok(())
}

/// Insert `suffix` before a file's extension, or append it when there is none
///
/// `a.txt` becomes `a (Copy).txt`; `Makefile`, `.bashrc` and every directory
/// keep their whole name as the stem.
pub fn with_suffix(name: &str, kind: HandleKind, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if kind == HandleKind::File && !stem.is_empty() => {
            format!("{stem}{suffix}.{ext}")
        }
        _ => format!("{name}{suffix}"),
    }
}

/// Name for a copy of `name` that does not collide with `taken`
///
/// Keeps `name` when it is free, then tries `a (Copy).txt`, `a (Copy 2).txt`,
/// `a (Copy 3).txt` and so on.
pub fn copy_name(name: &str, kind: HandleKind, suffix: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let first = with_suffix(name, kind, suffix);
    if !taken.contains(&first) {
        return first;
    }
    (2u64..)
        .map(|n| with_suffix(name, kind, &numbered(suffix, n)))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(first)
}

/// ` (Copy)` becomes ` (Copy 2)`; a suffix without a closing paren gets the
/// counter appended
fn numbered(suffix: &str, n: u64) -> String {
    match suffix.strip_suffix(')') {
        Some(open) => format!("{open} {n})"),
        None => format!("{suffix} {n}"),
    }
}

/// First free untitled name: `base`, then `base` + separator + 1, 2, ...
///
/// `ext` is appended after the counter, so files come out as `untitled.txt`,
/// `untitled1.txt` and directories as `Untitled Folder`, `Untitled Folder 1`.
pub fn untitled_name(base: &str, separator: &str, ext: &str, taken: &HashSet<String>) -> String {
    let candidate = format!("{base}{ext}");
    if !taken.contains(&candidate) {
        return candidate;
    }
    (1u64..)
        .map(|n| format!("{base}{separator}{n}{ext}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(candidate)
}

/// Normalize a requested extension to `.ext`; empty stays empty
pub fn dotted_extension(ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use fsaccess_vfs::MemoryDirectory;
    use proptest::prelude::*;

    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_with_suffix() {
        let file = HandleKind::File;
        assert_eq!(with_suffix("a.txt", file, " (Copy)"), "a (Copy).txt");
        assert_eq!(with_suffix("archive.tar.gz", file, " (Copy)"), "archive.tar (Copy).gz");
        assert_eq!(with_suffix("Makefile", file, " (Copy)"), "Makefile (Copy)");
        assert_eq!(with_suffix(".bashrc", file, " (Copy)"), ".bashrc (Copy)");
    }

    #[test]
    fn test_directory_suffix_ignores_dots() {
        let dir = HandleKind::Directory;
        assert_eq!(with_suffix("my.data", dir, " (Copy)"), "my.data (Copy)");
        assert_eq!(
            copy_name("my.data", dir, " (Copy)", &taken(&["my.data", "my.data (Copy)"])),
            "my.data (Copy 2)"
        );
    }

    #[test]
    fn test_copy_name() {
        let suffix = " (Copy)";
        let file = HandleKind::File;
        assert_eq!(copy_name("a.txt", file, suffix, &taken(&["b.txt"])), "a.txt");
        assert_eq!(copy_name("a.txt", file, suffix, &taken(&["a.txt"])), "a (Copy).txt");
        assert_eq!(
            copy_name("a.txt", file, suffix, &taken(&["a.txt", "a (Copy).txt"])),
            "a (Copy 2).txt"
        );
    }

    #[test]
    fn test_untitled_name() {
        assert_eq!(untitled_name("untitled", "", ".txt", &taken(&[])), "untitled.txt");
        assert_eq!(
            untitled_name("untitled", "", ".txt", &taken(&["untitled.txt"])),
            "untitled1.txt"
        );
        assert_eq!(
            untitled_name(
                "Untitled Folder",
                " ",
                "",
                &taken(&["Untitled Folder", "Untitled Folder 1"])
            ),
            "Untitled Folder 2"
        );
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension("txt"), ".txt");
        assert_eq!(dotted_extension(".md"), ".md");
        assert_eq!(dotted_extension(""), "");
    }

    #[tokio::test]
    async fn test_copy_entry_recreates_tree() {
        let root = MemoryDirectory::with_files(vec![
            ("src/a.txt", b"A".as_slice()),
            ("src/deep/b.bin", [0u8, 1, 2].as_slice()),
            ("src/empty/", b"".as_slice()),
        ]);
        let source = lookup::find(&root, "src", "src").await.unwrap();

        copy_entry(&source, &root, "dst").await.unwrap();

        let dst = root.get_directory("dst", false).await.unwrap();
        let a = dst.get_file("a.txt", false).await.unwrap();
        assert_eq!(a.read_bytes().await.unwrap(), b"A");
        let deep = dst.get_directory("deep", false).await.unwrap();
        let b = deep.get_file("b.bin", false).await.unwrap();
        assert_eq!(b.read_bytes().await.unwrap(), vec![0u8, 1, 2]);
        assert!(dst.get_directory("empty", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_copy_into_own_subtree_terminates() {
        let root = MemoryDirectory::with_files(vec![("src/a.txt", b"A")]);
        let source = lookup::find(&root, "src", "src").await.unwrap();
        let Handle::Directory(src) = &source else {
            panic!("expected directory");
        };

        copy_entry(&source, src.as_ref(), "nested").await.unwrap();

        let nested = src.get_directory("nested", false).await.unwrap();
        let names = lookup::child_names(nested.as_ref()).await.unwrap();
        assert_eq!(names, taken(&["a.txt"]));
    }

    proptest! {
        #[test]
        fn untitled_name_is_always_free(count in 0usize..20) {
            let mut names = HashSet::new();
            for _ in 0..count {
                let next = untitled_name("untitled", "", ".txt", &names);
                prop_assert!(!names.contains(&next));
                names.insert(next);
            }
            prop_assert_eq!(names.len(), count);
        }
    }
}
