//! Files picked by the user and attachments that passed validation.

use std::io;
use std::path::{Path, PathBuf};

/// A file the user selected, by name and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub path: PathBuf,
}

/// What the file picker reports about a selection, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub handle: FileHandle,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl CandidateFile {
    pub fn new(handle: FileHandle, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            handle,
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Inspect a file on disk: size from metadata, MIME type guessed from the extension.
    pub async fn inspect(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        Ok(Self::new(
            FileHandle {
                name,
                path: path.to_path_buf(),
            },
            mime_type,
            metadata.len(),
        ))
    }
}

/// An attachment that passed client-side validation and is ready to be sent.
///
/// Only the attachment validator constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    file: FileHandle,
    mime_type: String,
    size_bytes: u64,
}

impl StagedAttachment {
    pub(crate) fn new(file: FileHandle, mime_type: String, size_bytes: u64) -> Self {
        Self {
            file,
            mime_type,
            size_bytes,
        }
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}
