//! Entry name rules shared by all backends

use crate::error::{HandleError, Result};

/// Reject names that could address anything other than a direct child
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(HandleError::InvalidName(name.to_string()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(HandleError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Guess a mimetype from the entry name; empty when the extension is unknown
pub fn guess_mimetype(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_default()
}
