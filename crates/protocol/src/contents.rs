use serde::{Deserialize, Serialize};

/// Kind of entry described by a [`ContentModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    File,
    Directory,
}

/// Encoding of a file's `content`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// UTF-8 text
    Text,
    /// Base64-encoded bytes
    Base64,
    /// Structured data
    Json,
}

/// Payload carried in [`ContentModel::content`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Immediate children of a directory
    Listing(Vec<ContentModel>),
    /// Text, or base64 when the format says so
    Text(String),
    /// Structured data
    Json(serde_json::Value),
}

/// Metadata and (optionally) content of one file or directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentModel {
    pub name: String,
    /// Slash-separated path relative to the drive root, without drive prefix
    pub path: String,
    /// ISO 8601; empty when unknown
    pub created: String,
    /// ISO 8601; empty when unknown
    pub last_modified: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub format: Option<Format>,
    pub mimetype: String,
    pub content: Option<Content>,
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ContentModel {
    pub const fn is_directory(&self) -> bool {
        matches!(self.content_type, ContentType::Directory)
    }

    /// Children of a directory listing; empty for files and stubs
    pub fn children(&self) -> &[Self] {
        match &self.content {
            Some(Content::Listing(children)) => children,
            _ => &[],
        }
    }

    /// Text (or base64) content, if populated
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Options for fetching a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOptions {
    /// Populate file content / directory listing
    pub content: bool,
    /// Force a file format instead of classifying by mimetype
    pub format: Option<Format>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            content: true,
            format: None,
        }
    }
}

/// Options for saving an entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub format: Option<Format>,
    pub content: Option<Content>,
}

impl SaveOptions {
    pub const fn directory() -> Self {
        Self {
            content_type: Some(ContentType::Directory),
            format: None,
            content: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content_type: Some(ContentType::File),
            format: Some(Format::Text),
            content: Some(Content::Text(content.into())),
        }
    }

    pub fn base64(content: impl Into<String>) -> Self {
        Self {
            content_type: Some(ContentType::File),
            format: Some(Format::Base64),
            content: Some(Content::Text(content.into())),
        }
    }

    pub fn json(content: serde_json::Value) -> Self {
        Self {
            content_type: Some(ContentType::File),
            format: Some(Format::Json),
            content: Some(Content::Json(content)),
        }
    }
}

/// Options for creating an untitled entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOptions {
    /// Directory to create the entry in
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// File extension, with or without the leading dot
    #[serde(default)]
    pub ext: Option<String>,
}

/// Kind of change reported on the change stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    New,
    Delete,
    Rename,
    Save,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(rename = "oldValue")]
    pub old_value: Option<ContentModel>,
    #[serde(rename = "newValue")]
    pub new_value: Option<ContentModel>,
}

/// Checkpoint identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointModel {
    pub id: String,
    pub last_modified: String,
}
