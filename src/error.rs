use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("List file not found: {}", path.display())]
    ListNotFound { path: PathBuf },

    #[error("Manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Manifest contains no entries: {}", path.display())]
    EmptyManifest { path: PathBuf },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CopyError {
    /// Returns a user-friendly suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            CopyError::ListNotFound { .. } => {
                Some("Check the path exists and spelling is correct.")
            }
            CopyError::ManifestNotFound { .. } => {
                Some("Run `sha1copy cp` first to produce a hashes.sha1 manifest.")
            }
            CopyError::EmptyManifest { .. } => {
                Some("The manifest has no parseable '<hex>  <path>' lines.")
            }
            CopyError::Config(_) => Some("Check the --threads value is a positive integer."),
            CopyError::Io { .. } => None,
        }
    }
}
