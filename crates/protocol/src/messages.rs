/// Known content-service operations, addressable by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveMethod {
    // Entries
    Get,         // get
    Save,        // save
    Delete,      // delete
    Rename,      // rename
    Copy,        // copy
    NewUntitled, // new_untitled
    DownloadUrl, // download_url

    // Checkpoints
    CreateCheckpoint,  // create_checkpoint
    ListCheckpoints,   // list_checkpoints
    RestoreCheckpoint, // restore_checkpoint
    DeleteCheckpoint,  // delete_checkpoint

    Unknown(String),
}

impl DriveMethod {
    /// Whether the operation can change the backing store
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Save | Self::Delete | Self::Rename | Self::Copy | Self::NewUntitled
        )
    }
}

impl From<&str> for DriveMethod {
    fn from(s: &str) -> Self {
        match s {
            "get" => Self::Get,
            "save" => Self::Save,
            "delete" => Self::Delete,
            "rename" => Self::Rename,
            "copy" => Self::Copy,
            "new_untitled" | "new" => Self::NewUntitled,
            "download_url" => Self::DownloadUrl,
            "create_checkpoint" => Self::CreateCheckpoint,
            "list_checkpoints" => Self::ListCheckpoints,
            "restore_checkpoint" => Self::RestoreCheckpoint,
            "delete_checkpoint" => Self::DeleteCheckpoint,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for DriveMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "get",
            Self::Save => "save",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::Copy => "copy",
            Self::NewUntitled => "new_untitled",
            Self::DownloadUrl => "download_url",
            Self::CreateCheckpoint => "create_checkpoint",
            Self::ListCheckpoints => "list_checkpoints",
            Self::RestoreCheckpoint => "restore_checkpoint",
            Self::DeleteCheckpoint => "delete_checkpoint",
            Self::Unknown(s) => s,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip() {
        for name in ["get", "save", "new_untitled", "list_checkpoints"] {
            assert_eq!(DriveMethod::from(name).to_string(), name);
        }
        assert_eq!(DriveMethod::from("new"), DriveMethod::NewUntitled);
        assert_eq!(
            DriveMethod::from("mount"),
            DriveMethod::Unknown("mount".to_string())
        );
        assert!(DriveMethod::Rename.is_mutation());
        assert!(!DriveMethod::ListCheckpoints.is_mutation());
    }
}
