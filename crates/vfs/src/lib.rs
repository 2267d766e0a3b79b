//! Capability-style storage handles
//!
//! A directory handle grants access to its named children and nothing else:
//! there is no path-based lookup anywhere in this crate. Callers walk the tree
//! one child at a time.

pub mod error;
pub mod handle;
pub mod local;
pub mod memory;
pub mod name;

pub use error::{HandleError, Result};
pub use handle::{
    ChildStream, DirectoryHandle, FileHandle, FileMetadata, Handle, HandleKind, WritableSink,
};
pub use local::LocalDirectory;
pub use memory::MemoryDirectory;
