//! Input gate: the document and the instruction the user wants applied.
//!
//! A [`DocumentCandidate`] is whatever the user picked; it becomes a
//! [`SelectedDocument`] only once its name passes [`validate`]. The session
//! keeps at most one selected document, so re-selecting replaces it and an
//! invalid pick clears it.

use crate::config::ACCEPTED_EXTENSION;
use crate::error::DocFlowError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// An unvalidated file handed to the gate.
#[derive(Clone)]
pub struct DocumentCandidate {
    name: String,
    bytes: Arc<[u8]>,
}

impl DocumentCandidate {
    /// Wrap an in-memory file.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Read a file from disk. The candidate's name is the path's file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DocFlowError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => DocFlowError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => DocFlowError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DocFlowError::FileNotFound {
                path: PathBuf::from(path),
            })?;

        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for DocumentCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCandidate")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// A document that passed the extension gate.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl SelectedDocument {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

impl fmt::Debug for SelectedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedDocument")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Check a candidate against the accepted extension.
///
/// The match is case-sensitive: `REPORT.DOCX` is rejected.
pub fn validate(candidate: DocumentCandidate) -> Result<SelectedDocument, DocFlowError> {
    if !has_accepted_extension(&candidate.name) {
        return Err(DocFlowError::InvalidDocumentType {
            name: candidate.name,
            expected: ACCEPTED_EXTENSION.to_string(),
        });
    }
    Ok(SelectedDocument {
        name: candidate.name,
        bytes: candidate.bytes,
    })
}

/// True when `name` ends with [`ACCEPTED_EXTENSION`].
pub fn has_accepted_extension(name: &str) -> bool {
    name.ends_with(ACCEPTED_EXTENSION)
}

/// True when the instruction has something other than whitespace.
pub fn instruction_is_usable(instruction: &str) -> bool {
    !instruction.trim().is_empty()
}
