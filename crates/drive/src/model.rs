//! Translation of handles into content models

use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use fsaccess_protocol::{Content, ContentModel, ContentType, Format, GetOptions};
use fsaccess_vfs::{DirectoryHandle, FileHandle, Handle};

use crate::error::{DriveError, Result};
use crate::lookup;
use crate::path;

const DIRECTORY_MIMETYPE: &str = "application/json";
const TEXT_MIMETYPE: &str = "text/plain";
const BINARY_MIMETYPE: &str = "application/octet-stream";

/// Pick a transfer format from a mimetype
///
/// Only `image/*`, `audio/*` and `video/*` count as binary. Everything else,
/// including an unknown mimetype, is served as text.
pub fn classify(mimetype: &str) -> Format {
    let primary = mimetype.split('/').next().unwrap_or_default();
    match primary {
        "image" | "audio" | "video" => Format::Base64,
        _ => Format::Text,
    }
}

/// ISO 8601 rendering of a backend timestamp; empty when unknown
pub fn timestamp(time: Option<SystemTime>) -> String {
    time.map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

fn now() -> String {
    timestamp(Some(SystemTime::now()))
}

/// Model for a file; `parent_path` is the logical path of its directory
pub async fn build_file(
    file: &dyn FileHandle,
    parent_path: &str,
    include_content: bool,
    format: Option<Format>,
) -> Result<ContentModel> {
    let meta = file.metadata().await?;
    let path = path::join(parent_path, &meta.name);
    let format = format.unwrap_or_else(|| classify(&meta.mimetype));

    let mimetype = if !meta.mimetype.is_empty() {
        meta.mimetype
    } else if format == Format::Base64 {
        BINARY_MIMETYPE.to_string()
    } else {
        TEXT_MIMETYPE.to_string()
    };

    let content = if include_content {
        Some(match format {
            Format::Base64 => Content::Text(STANDARD.encode(file.read_bytes().await?)),
            Format::Text => Content::Text(file.read_text().await?),
            Format::Json => {
                let text = file.read_text().await?;
                let value = serde_json::from_str(&text).map_err(|e| DriveError::InvalidContent {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Content::Json(value)
            }
        })
    } else {
        None
    };

    let modified = timestamp(meta.last_modified);
    Ok(ContentModel {
        name: meta.name,
        path,
        created: modified.clone(),
        last_modified: modified,
        content_type: ContentType::File,
        format: Some(format),
        mimetype,
        content,
        writable: true,
        size: Some(meta.size),
    })
}

/// Model for a directory without its children
pub fn directory_stub(path: &str) -> ContentModel {
    let (_, name) = path::split(path);
    ContentModel {
        name: name.to_string(),
        path: path.to_string(),
        created: String::new(),
        last_modified: String::new(),
        content_type: ContentType::Directory,
        format: None,
        mimetype: DIRECTORY_MIMETYPE.to_string(),
        content: None,
        writable: true,
        size: None,
    }
}

/// Model for a directory with one level of children
///
/// Child directories appear as stubs. Child files carry content only when
/// `file_content` is set.
pub async fn build_directory_listing(
    dir: &dyn DirectoryHandle,
    path: &str,
    file_content: bool,
) -> Result<ContentModel> {
    let mut entries = Vec::new();
    for child in lookup::children(dir).await? {
        let model = match &child {
            Handle::File(file) => build_file(file.as_ref(), path, file_content, None).await?,
            Handle::Directory(sub) => directory_stub(&path::join(path, sub.name())),
        };
        entries.push(model);
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ContentModel {
        format: Some(Format::Json),
        content: Some(Content::Listing(entries)),
        ..directory_stub(path)
    })
}

/// Model for any handle, honoring fetch options
pub async fn build(
    handle: &Handle,
    path: &str,
    options: GetOptions,
    listing_file_content: bool,
) -> Result<ContentModel> {
    match handle {
        Handle::File(file) => {
            let (parent, _) = path::split(path);
            build_file(file.as_ref(), parent, options.content, options.format).await
        }
        Handle::Directory(dir) if options.content => {
            build_directory_listing(dir.as_ref(), path, listing_file_content).await
        }
        Handle::Directory(_) => Ok(directory_stub(path)),
    }
}

/// Bytes to write for a save request; `None` when no content was given
///
/// Base64 payloads are decoded and structured values are pretty-printed.
/// Text is written verbatim, but must parse when the format is `json`.
pub fn encode_content(
    path: &str,
    format: Option<Format>,
    content: Option<&Content>,
) -> Result<Option<Vec<u8>>> {
    let invalid = |reason: String| DriveError::InvalidContent {
        path: path.to_string(),
        reason,
    };
    let Some(content) = content else {
        return Ok(None);
    };
    let bytes = match (format, content) {
        (_, Content::Listing(_)) => {
            return Err(invalid("a directory listing cannot be written to a file".to_string()))
        }
        (_, Content::Json(value)) => {
            serde_json::to_vec_pretty(value).map_err(|e| invalid(e.to_string()))?
        }
        (Some(Format::Base64), Content::Text(text)) => STANDARD
            .decode(text.trim_end())
            .map_err(|e| invalid(e.to_string()))?,
        (Some(Format::Json), Content::Text(text)) => {
            serde_json::from_str::<serde_json::Value>(text).map_err(|e| invalid(e.to_string()))?;
            text.as_bytes().to_vec()
        }
        (_, Content::Text(text)) => text.as_bytes().to_vec(),
    };
    Ok(Some(bytes))
}

/// Listing returned before any root directory has been granted
pub fn empty_root() -> ContentModel {
    let stamp = now();
    ContentModel {
        created: stamp.clone(),
        last_modified: stamp,
        format: Some(Format::Json),
        content: Some(Content::Listing(Vec::new())),
        ..directory_stub("")
    }
}

#[cfg(test)]
mod tests {
    use fsaccess_vfs::MemoryDirectory;

    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("image/png"), Format::Base64);
        assert_eq!(classify("audio/mpeg"), Format::Base64);
        assert_eq!(classify("video/mp4"), Format::Base64);
        assert_eq!(classify("text/plain"), Format::Text);
        assert_eq!(classify("application/pdf"), Format::Text);
        assert_eq!(classify(""), Format::Text);
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(timestamp(None), "");
        assert_eq!(
            timestamp(Some(SystemTime::UNIX_EPOCH)),
            "1970-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_encode_content() {
        let text = Content::Text("plain".into());
        assert_eq!(
            encode_content("a.txt", Some(Format::Text), Some(&text)).unwrap(),
            Some(b"plain".to_vec())
        );

        let b64 = Content::Text("iVBORw==".into());
        assert_eq!(
            encode_content("a.png", Some(Format::Base64), Some(&b64)).unwrap(),
            Some(vec![0x89, 0x50, 0x4e, 0x47])
        );

        let data = Content::Json(serde_json::json!({"a": 1}));
        assert_eq!(
            encode_content("a.json", Some(Format::Json), Some(&data)).unwrap(),
            Some(b"{\n  \"a\": 1\n}".to_vec())
        );

        assert!(encode_content("a.txt", None, None).unwrap().is_none());
        assert!(encode_content("a.png", Some(Format::Base64), Some(&text)).is_err());
        let raw = Content::Text("{\"a\": 1}".into());
        assert_eq!(
            encode_content("a.json", Some(Format::Json), Some(&raw)).unwrap(),
            Some(b"{\"a\": 1}".to_vec())
        );
        assert!(encode_content("a.json", Some(Format::Json), Some(&text)).is_err());
        let listing = Content::Listing(Vec::new());
        assert!(encode_content("a.txt", None, Some(&listing)).is_err());
    }

    #[tokio::test]
    async fn test_build_file_binary_and_text() {
        let root = MemoryDirectory::with_files(vec![
            ("pics/dot.png", [0x89u8, 0x50, 0x4e, 0x47].as_slice()),
            ("pics/notes.txt", b"hello".as_slice()),
        ]);
        let pics = root.get_directory("pics", false).await.unwrap();

        let png = pics.get_file("dot.png", false).await.unwrap();
        let model = build_file(png.as_ref(), "pics", true, None).await.unwrap();
        assert_eq!(model.path, "pics/dot.png");
        assert_eq!(model.format, Some(Format::Base64));
        assert_eq!(model.text(), Some("iVBORw=="));
        assert_eq!(model.size, Some(4));

        let txt = pics.get_file("notes.txt", false).await.unwrap();
        let model = build_file(txt.as_ref(), "pics", false, None).await.unwrap();
        assert_eq!(model.format, Some(Format::Text));
        assert_eq!(model.mimetype, "text/plain");
        assert!(model.content.is_none());
        assert!(!model.last_modified.is_empty());
        assert_eq!(model.created, model.last_modified);
    }

    #[tokio::test]
    async fn test_listing_is_one_level_deep() {
        let root = MemoryDirectory::with_files(vec![
            ("top.txt", b"t".as_slice()),
            ("sub/inner.txt", b"i".as_slice()),
        ]);

        let model = build_directory_listing(&root, "", true).await.unwrap();
        assert!(model.is_directory());
        assert_eq!(model.name, "");
        let children = model.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "sub");
        assert!(children[0].content.is_none());
        assert_eq!(children[0].created, "");
        assert_eq!(children[1].text(), Some("t"));
    }
}
