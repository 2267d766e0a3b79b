use fsaccess_vfs::HandleError;

/// Errors surfaced by drive operations
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("no root directory has been granted")]
    NoRootEstablished,
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("{0} is not implemented by this drive")]
    NotImplemented(&'static str),
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid content for {path}: {reason}")]
    InvalidContent { path: String, reason: String },
    /// The copy step of a rename completed but the source could not be
    /// removed; both entries now exist.
    #[error("rename of {from} to {to} copied the entry but left the source in place: {source}")]
    PartialRename {
        from: String,
        to: String,
        #[source]
        source: Box<DriveError>,
    },
    #[error("backend error: {0}")]
    Backend(#[from] HandleError),
}

impl DriveError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Attach a logical path to a backend "not found"
    pub(crate) fn at(err: HandleError, path: &str) -> Self {
        match err {
            HandleError::NotFound(_) | HandleError::TypeMismatch(_) => Self::NotFound(path.to_string()),
            other => Self::Backend(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;
