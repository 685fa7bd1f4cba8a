//! Error types for the docx-reformat library.
//!
//! Every failure the workflow can hit is a variant of [`DocFlowError`]. The
//! variants group into the five kinds of [`ErrorKind`], which is what the
//! session uses to decide how a failure is surfaced:
//!
//! * **Validation**: the user picked the wrong kind of file. Recoverable on
//!   the spot; the user is simply asked to choose again.
//! * **Network**: the service could not be reached (connect, TLS, timeout).
//! * **Server**: the service answered with a non-success status.
//! * **Decode**: the service answered "success" but the body was not the
//!   expected shape, or the artifact was not valid base64.
//! * **Uncaught**: a panic escaped normal control flow.
//!
//! None of these abort the session: the state machine always lands in a
//! terminal state and hands control back to the user.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docx-reformat library.
#[derive(Debug, Error)]
pub enum DocFlowError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The selected file does not carry the accepted extension.
    #[error("Invalid file type '{name}': only {expected} files are accepted")]
    InvalidDocumentType { name: String, expected: String },

    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A new document was offered while a request is in flight.
    #[error("A document is already being processed. Please wait.")]
    Busy,

    // ── Network errors ────────────────────────────────────────────────────
    /// The request never produced a response.
    #[error("Could not reach the processing service at '{endpoint}': {reason}")]
    Network { endpoint: String, reason: String },

    /// The configured request timeout elapsed.
    #[error("Request to '{endpoint}' timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    // ── Server errors ─────────────────────────────────────────────────────
    /// The service answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The success body was not JSON of the expected shape.
    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    /// A required field was absent from the success body.
    #[error("Service response is missing the '{0}' field")]
    MissingField(&'static str),

    /// `docx_base64` was not valid standard-alphabet base64.
    #[error("Returned document is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    // ── Uncaught ──────────────────────────────────────────────────────────
    /// A panic escaped the service call.
    #[error("Unexpected failure: {0}")]
    Panicked(String),

    /// A second uncaught-error subscription was requested.
    #[error("An uncaught-error subscription is already installed")]
    AlreadySubscribed,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not save the downloaded artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
    Decode,
    Uncaught,
}

impl DocFlowError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocFlowError::InvalidDocumentType { .. }
            | DocFlowError::FileNotFound { .. }
            | DocFlowError::PermissionDenied { .. }
            | DocFlowError::Busy
            | DocFlowError::InvalidConfig(_) => ErrorKind::Validation,
            DocFlowError::Network { .. } | DocFlowError::Timeout { .. } => ErrorKind::Network,
            DocFlowError::Server { .. } => ErrorKind::Server,
            DocFlowError::MalformedResponse(_)
            | DocFlowError::MissingField(_)
            | DocFlowError::InvalidBase64(_) => ErrorKind::Decode,
            DocFlowError::Panicked(_)
            | DocFlowError::AlreadySubscribed
            | DocFlowError::OutputWriteFailed { .. }
            | DocFlowError::Internal(_) => ErrorKind::Uncaught,
        }
    }
}
