//! fsaccess-drive: content-service drive over a capability handle tree
//!
//! Exposes get/save/delete/rename/copy/new-untitled over a root
//! [`fsaccess_vfs::DirectoryHandle`] granted at runtime, and publishes a
//! change event for every successful mutation.

pub mod config;
pub mod drive;
pub mod error;
pub mod events;
pub mod lookup;
pub mod model;
pub mod path;
pub mod tree;

pub use config::DriveConfig;
pub use drive::{Drive, CHECKPOINT_ID};
pub use error::{DriveError, Result};
pub use fsaccess_protocol::{
    ChangeEvent, ChangeType, CheckpointModel, Content, ContentModel, ContentType, CreateOptions,
    Format, GetOptions, SaveOptions,
};
