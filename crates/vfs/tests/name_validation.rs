use fsaccess_vfs::{DirectoryHandle, HandleError, LocalDirectory, MemoryDirectory};
use tempfile::tempdir;

#[tokio::test]
async fn test_child_names_cannot_escape_local_root() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("valid.txt"), b"ok").unwrap();
    let root = LocalDirectory::open(dir.path().join(".")).unwrap();

    // Separators and dot segments are rejected before touching the disk
    for name in ["../etc", "..", ".", "a/b", "a\\b", ""] {
        let result = root.get_file(name, true).await;
        assert!(
            matches!(result, Err(HandleError::InvalidName(_))),
            "{name:?} should be rejected"
        );
    }

    // Normal names keep working
    assert!(root.get_file("valid.txt", false).await.is_ok());
}

#[tokio::test]
async fn test_memory_and_local_reject_the_same_names() {
    let dir = tempdir().unwrap();
    let local = LocalDirectory::open(dir.path()).unwrap();
    let memory = MemoryDirectory::new("root");

    for name in ["..", "x/y", "nul\0byte"] {
        assert!(local.get_directory(name, true).await.is_err());
        assert!(memory.get_directory(name, true).await.is_err());
    }
}

#[tokio::test]
async fn test_open_rejects_missing_root() {
    let dir = tempdir().unwrap();
    let result = LocalDirectory::open(dir.path().join("missing"));
    assert!(result.unwrap_err().is_not_found());
}
