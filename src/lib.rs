//! # docx-reformat
//!
//! Send a Word document and a plain-language edit instruction to a remote
//! formatter, preview what came back, and save the new version.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx + instruction
//!  │
//!  ├─ 1. Gate      accept only `.docx`, require a non-blank instruction
//!  ├─ 2. Submit    one multipart POST (`file`, `format_text`), single flight
//!  ├─ 3. Decode    validate JSON, base64 → bytes, derive `<name>_v1.docx`
//!  ├─ 4. Preview   markup fragment, verbatim or plain-text for terminals
//!  └─ 5. Download  temp file → persisted under the versioned name
//! ```
//!
//! Failures from any step, and panics anywhere in the process once an
//! [`UncaughtSubscription`] is installed, are collected in an ordered
//! [`ErrorLog`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx_reformat::{DocumentCandidate, Session, SubmitOutcome, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(WorkflowConfig::default())?;
//!     session.select_document(DocumentCandidate::from_path("report.docx").await?)?;
//!     session.set_instruction("remove lines containing _____");
//!
//!     if let SubmitOutcome::Succeeded = session.submit().await {
//!         println!("{}", session.preview().unwrap_or_default());
//!         session.trigger_download(".").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docx-reformat` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod errlog;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod service;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{WorkflowConfig, WorkflowConfigBuilder, ACCEPTED_EXTENSION, DEFAULT_ENDPOINT, DOCX_MEDIA_TYPE};
pub use document::{DocumentCandidate, SelectedDocument};
pub use errlog::{ErrorLog, ErrorRecord, SourceLocation, UncaughtSubscription};
pub use error::{DocFlowError, ErrorKind};
pub use pipeline::decode::{DecodedArtifact, ProcessedResult, ServiceResponse};
pub use pipeline::download::derive_download_name;
pub use progress::{NoopObserver, SharedObserver, WorkflowObserver};
pub use service::{DocumentService, HttpDocumentService, ProcessRequest, ServiceReply};
pub use session::{DownloadOutcome, ProcessingState, Session, StatusKind, StatusMessage, SubmitOutcome};
