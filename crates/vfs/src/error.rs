/// Errors raised by handle operations
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("entry not found: {0}")]
    NotFound(String),
    #[error("entry has the wrong kind: {0}")]
    TypeMismatch(String),
    #[error("directory not empty: {0}")]
    NotEmpty(String),
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandleError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, HandleError>;
