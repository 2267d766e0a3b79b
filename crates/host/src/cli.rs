//! Request parsing and dispatch
//!
//! Turns `<method> [args] [options]` into a drive call and renders the result
//! as JSON.

use anyhow::{bail, Context};
use fsaccess_drive::{
    Content, ContentType, CreateOptions, Drive, Format, GetOptions, SaveOptions, CHECKPOINT_ID,
};
use fsaccess_protocol::DriveMethod;
use serde_json::{json, Value};

/// One drive call, fully parsed
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Get { path: String, options: GetOptions },
    Save { path: String, options: SaveOptions },
    Delete { path: String },
    Rename { from: String, to: String },
    Copy { path: String, to_dir: String },
    NewUntitled(CreateOptions),
    DownloadUrl { path: String },
    CreateCheckpoint { path: String },
    ListCheckpoints { path: String },
    RestoreCheckpoint { path: String, id: String },
    DeleteCheckpoint { path: String, id: String },
}

fn parse_format(value: &str) -> anyhow::Result<Format> {
    match value {
        "text" => Ok(Format::Text),
        "base64" => Ok(Format::Base64),
        "json" => Ok(Format::Json),
        other => bail!("unknown format {other:?} (expected text, base64 or json)"),
    }
}

fn parse_type(value: &str) -> anyhow::Result<ContentType> {
    match value {
        "file" => Ok(ContentType::File),
        "directory" | "dir" => Ok(ContentType::Directory),
        other => bail!("unknown entry type {other:?} (expected file or directory)"),
    }
}

/// Positional arguments and `--flag value` options of one request
#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    format: Option<Format>,
    content_type: Option<ContentType>,
    ext: Option<String>,
    no_content: bool,
}

impl Args {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--format" if i + 1 < args.len() => {
                    parsed.format = Some(parse_format(&args[i + 1])?);
                    i += 1;
                }
                "--type" if i + 1 < args.len() => {
                    parsed.content_type = Some(parse_type(&args[i + 1])?);
                    i += 1;
                }
                "--ext" if i + 1 < args.len() => {
                    parsed.ext = Some(args[i + 1].clone());
                    i += 1;
                }
                "--dir" => parsed.content_type = Some(ContentType::Directory),
                "--no-content" => parsed.no_content = true,
                flag if flag.starts_with("--") => bail!("unknown or incomplete option {flag}"),
                value => parsed.positional.push(value.to_string()),
            }
            i += 1;
        }
        Ok(parsed)
    }

    /// Positional argument `index`, or `default` when absent
    fn arg_or(&self, index: usize, default: &str) -> String {
        self.positional
            .get(index)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn arg(&self, index: usize, what: &str) -> anyhow::Result<String> {
        self.positional
            .get(index)
            .cloned()
            .with_context(|| format!("missing {what}"))
    }
}

impl Request {
    /// Parse a method name and its arguments
    pub fn parse(method: &str, args: &[String]) -> anyhow::Result<Self> {
        let args = Args::parse(args)?;
        let request = match DriveMethod::from(method) {
            DriveMethod::Get => Self::Get {
                path: args.arg_or(0, ""),
                options: GetOptions {
                    content: !args.no_content,
                    format: args.format,
                },
            },
            DriveMethod::Save => Self::Save {
                path: args.arg(0, "path")?,
                options: SaveOptions {
                    content_type: Some(args.content_type.unwrap_or(ContentType::File)),
                    format: args.format,
                    content: None,
                },
            },
            DriveMethod::Delete => Self::Delete {
                path: args.arg(0, "path")?,
            },
            DriveMethod::Rename => Self::Rename {
                from: args.arg(0, "source path")?,
                to: args.arg(1, "destination path")?,
            },
            DriveMethod::Copy => Self::Copy {
                path: args.arg(0, "source path")?,
                to_dir: args.arg_or(1, ""),
            },
            DriveMethod::NewUntitled => Self::NewUntitled(CreateOptions {
                path: args.arg_or(0, ""),
                content_type: args.content_type.unwrap_or(ContentType::File),
                ext: args.ext.clone(),
            }),
            DriveMethod::DownloadUrl => Self::DownloadUrl {
                path: args.arg(0, "path")?,
            },
            DriveMethod::CreateCheckpoint => Self::CreateCheckpoint {
                path: args.arg(0, "path")?,
            },
            DriveMethod::ListCheckpoints => Self::ListCheckpoints {
                path: args.arg(0, "path")?,
            },
            DriveMethod::RestoreCheckpoint => Self::RestoreCheckpoint {
                path: args.arg(0, "path")?,
                id: args.arg_or(1, CHECKPOINT_ID),
            },
            DriveMethod::DeleteCheckpoint => Self::DeleteCheckpoint {
                path: args.arg(0, "path")?,
                id: args.arg_or(1, CHECKPOINT_ID),
            },
            DriveMethod::Unknown(name) => bail!("unknown method {name:?}"),
        };
        Ok(request)
    }

    /// Operation this request calls
    pub const fn method(&self) -> DriveMethod {
        match self {
            Self::Get { .. } => DriveMethod::Get,
            Self::Save { .. } => DriveMethod::Save,
            Self::Delete { .. } => DriveMethod::Delete,
            Self::Rename { .. } => DriveMethod::Rename,
            Self::Copy { .. } => DriveMethod::Copy,
            Self::NewUntitled(_) => DriveMethod::NewUntitled,
            Self::DownloadUrl { .. } => DriveMethod::DownloadUrl,
            Self::CreateCheckpoint { .. } => DriveMethod::CreateCheckpoint,
            Self::ListCheckpoints { .. } => DriveMethod::ListCheckpoints,
            Self::RestoreCheckpoint { .. } => DriveMethod::RestoreCheckpoint,
            Self::DeleteCheckpoint { .. } => DriveMethod::DeleteCheckpoint,
        }
    }

    /// Whether file content should be read from stdin before executing
    pub fn needs_input(&self) -> bool {
        matches!(
            self,
            Self::Save { options, .. } if options.content_type == Some(ContentType::File)
        )
    }

    /// Attach stdin content to a file save, interpreted per its format
    pub fn with_input(self, input: String) -> anyhow::Result<Self> {
        let (path, mut options) = match self {
            Self::Save { path, options } => (path, options),
            other => return Ok(other),
        };
        options.content = Some(match options.format {
            Some(Format::Json) => {
                let value: Value =
                    serde_json::from_str(&input).context("stdin is not valid JSON")?;
                Content::Json(value)
            }
            _ => Content::Text(input),
        });
        Ok(Self::Save { path, options })
    }
}

/// Run one request against `drive` and render its result
pub async fn execute(drive: &Drive, request: Request) -> anyhow::Result<Value> {
    let method = request.method();
    tracing::debug!(%method, mutation = method.is_mutation(), "Executing request");
    let value = match request {
        Request::Get { path, options } => serde_json::to_value(drive.get(&path, options).await?)?,
        Request::Save { path, options } => serde_json::to_value(drive.save(&path, options).await?)?,
        Request::Delete { path } => {
            drive.delete(&path).await?;
            json!({ "deleted": path })
        }
        Request::Rename { from, to } => serde_json::to_value(drive.rename(&from, &to).await?)?,
        Request::Copy { path, to_dir } => serde_json::to_value(drive.copy(&path, &to_dir).await?)?,
        Request::NewUntitled(options) => serde_json::to_value(drive.new_untitled(options).await?)?,
        Request::DownloadUrl { path } => json!({ "url": drive.get_download_url(&path)? }),
        Request::CreateCheckpoint { path } => serde_json::to_value(drive.create_checkpoint(&path))?,
        Request::ListCheckpoints { path } => serde_json::to_value(drive.list_checkpoints(&path))?,
        Request::RestoreCheckpoint { path, id } => {
            drive.restore_checkpoint(&path, &id);
            json!({ "restored": id })
        }
        Request::DeleteCheckpoint { path, id } => {
            drive.delete_checkpoint(&path, &id);
            json!({ "deleted": id })
        }
    };
    Ok(value)
}
