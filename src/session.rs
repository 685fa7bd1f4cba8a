//! The processing session: one document, one instruction, one request at a time.
//!
//! A [`Session`] owns the [`ProcessingState`] machine:
//!
//! ```text
//!            submit()                 2xx + valid body
//!  Idle ─────────────▶ Submitting ─────────────────────▶ Succeeded
//!   ▲                      │                                 │
//!   │                      │ non-2xx / transport /           │
//!   │                      │ decode failure / panic          │
//!   │                      ▼                                 │
//!   └── select_document ─ Failed ◀─── submit() re-enters ────┘
//! ```
//!
//! Every method takes `&self`; the mutable state sits behind a mutex that is
//! never held across the network call. The guard check and the move to
//! `Submitting` happen under one lock acquisition, so a second `submit()`
//! issued while a request is in flight always sees `Submitting` and returns
//! an advisory instead of dispatching.

use crate::config::{WorkflowConfig, ACCEPTED_EXTENSION};
use crate::document::{self, DocumentCandidate, SelectedDocument};
use crate::errlog::{panic_message, ErrorLog, ErrorRecord};
use crate::error::DocFlowError;
use crate::pipeline::decode::{self, ProcessedResult};
use crate::pipeline::{download, preview};
use crate::progress::SharedObserver;
use crate::service::{DocumentService, HttpDocumentService, ProcessRequest, ServiceReply};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Origin recorded for document-selection failures.
pub const SELECT_ORIGIN: &str = "selectDocument";

/// Origin recorded for processing failures.
pub const PROCESS_ORIGIN: &str = "processDocument";

/// Origin recorded for failures while saving the artifact.
pub const DOWNLOAD_ORIGIN: &str = "triggerDownload";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl ProcessingState {
    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingState::Succeeded | ProcessingState::Failed)
    }
}

/// How a status line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Info,
    /// A notice that is not a recorded error.
    Advisory,
    Success,
    Error,
}

/// The single user-visible status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// What a call to [`Session::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The entry guard refused; no request was sent.
    Skipped { advisory: String },
    Succeeded,
    Failed { reason: String },
}

impl SubmitOutcome {
    /// True when a request actually went out.
    pub fn dispatched(&self) -> bool {
        !matches!(self, SubmitOutcome::Skipped { .. })
    }
}

/// What a call to [`Session::trigger_download`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    /// There was nothing to save.
    Unavailable { advisory: String },
}

const ADVISORY_NO_DOCUMENT: &str = "Please select a Word document first.";
const ADVISORY_NO_INSTRUCTION: &str = "Please describe what you want to remove or change.";
const ADVISORY_IN_FLIGHT: &str = "A document is already being processed. Please wait.";
const ADVISORY_NOTHING_TO_DOWNLOAD: &str = "There is no processed document to download yet.";
const STATUS_PROCESSING: &str = "Processing document…";
const STATUS_SUCCEEDED: &str = "Document processed successfully. Ready to download and preview!";

#[derive(Debug, Default)]
struct Inner {
    document: Option<SelectedDocument>,
    instruction: String,
    state: ProcessingState,
    progress: u8,
    status: Option<StatusMessage>,
    result: Option<ProcessedResult>,
}

enum Event {
    State(ProcessingState, ProcessingState),
    Progress(u8),
    Status(StatusMessage),
    Error(ErrorRecord),
}

impl Inner {
    fn set_state(&mut self, to: ProcessingState, events: &mut Vec<Event>) {
        if self.state != to {
            debug!("State {:?} → {:?}", self.state, to);
            events.push(Event::State(self.state, to));
            self.state = to;
        }
    }

    fn set_progress(&mut self, percent: u8, events: &mut Vec<Event>) {
        if self.progress != percent {
            events.push(Event::Progress(percent));
            self.progress = percent;
        }
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>, events: &mut Vec<Event>) {
        let status = StatusMessage::new(kind, text);
        events.push(Event::Status(status.clone()));
        self.status = Some(status);
    }
}

/// A single-document, single-flight conversion session.
pub struct Session {
    config: WorkflowConfig,
    service: Arc<dyn DocumentService>,
    errors: ErrorLog,
    observer: Option<SharedObserver>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("service", &"<dyn DocumentService>")
            .field("errors", &self.errors.len())
            .field("observer", &self.observer.as_ref().map(|_| "<dyn WorkflowObserver>"))
            .field("inner", &*self.lock())
            .finish()
    }
}

impl Session {
    /// Create a session talking to `config.endpoint` over HTTP.
    pub fn new(config: WorkflowConfig) -> Result<Self, DocFlowError> {
        let service = HttpDocumentService::new(&config)?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// Create a session backed by any [`DocumentService`].
    pub fn with_service(config: WorkflowConfig, service: Arc<dyn DocumentService>) -> Self {
        Self {
            config,
            service,
            errors: ErrorLog::new(),
            observer: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Attach an observer for state, progress, status, and error events.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use `log` instead of a private error log.
    ///
    /// Pass the same handle to [`crate::UncaughtSubscription::install`] so
    /// panics land in the log this session shows.
    pub fn with_error_log(mut self, log: ErrorLog) -> Self {
        self.errors = log;
        self
    }

    // ── Input gate ───────────────────────────────────────────────────────

    /// Select the document to process.
    ///
    /// Refused with [`DocFlowError::Busy`] while a request is in flight; the
    /// held document, result, and log stay untouched. A name without the
    /// accepted extension is rejected: any previously selected document is
    /// cleared and the rejection is recorded. An accepted document replaces
    /// the previous one and clears the error log and any earlier result.
    pub fn select_document(&self, candidate: DocumentCandidate) -> Result<(), DocFlowError> {
        let mut events = Vec::new();
        let outcome = {
            let mut inner = self.lock();
            if inner.state == ProcessingState::Submitting {
                debug!("select_document() refused: request in flight");
                return Err(DocFlowError::Busy);
            }
            match document::validate(candidate) {
                Ok(doc) => {
                    info!("Selected '{}' ({} bytes)", doc.name(), doc.size());
                    self.errors.reset();
                    inner.result = None;
                    inner.set_progress(0, &mut events);
                    inner.set_state(ProcessingState::Idle, &mut events);
                    inner.set_status(
                        StatusKind::Info,
                        format!("Selected file: {}", doc.name()),
                        &mut events,
                    );
                    inner.document = Some(doc);
                    Ok(())
                }
                Err(e) => {
                    warn!("Rejected document: {}", e);
                    inner.document = None;
                    self.record(ErrorRecord::from_error(SELECT_ORIGIN, &e), &mut events);
                    inner.set_status(
                        StatusKind::Error,
                        format!("Invalid file type: please select a valid {ACCEPTED_EXTENSION} file."),
                        &mut events,
                    );
                    Err(e)
                }
            }
        };
        self.emit(events);
        outcome
    }

    /// Store the instruction exactly as typed.
    pub fn set_instruction(&self, text: impl Into<String>) {
        self.lock().instruction = text.into();
    }

    /// True when `submit()` would dispatch a request.
    pub fn is_ready(&self) -> bool {
        let inner = self.lock();
        inner.document.is_some()
            && document::instruction_is_usable(&inner.instruction)
            && inner.state != ProcessingState::Submitting
    }

    // ── Orchestration ────────────────────────────────────────────────────

    /// Send the selected document and instruction to the service.
    ///
    /// Without a document, without a non-blank instruction, or while another
    /// request is in flight this is a no-op returning
    /// [`SubmitOutcome::Skipped`]. Otherwise exactly one request is issued and
    /// the session always finishes in `Succeeded` or `Failed`.
    pub async fn submit(&self) -> SubmitOutcome {
        let start = Instant::now();
        let mut events = Vec::new();

        // ── Step 1: Entry guard + transition to Submitting ───────────────
        let request = {
            let mut inner = self.lock();
            if inner.state == ProcessingState::Submitting {
                debug!("submit() ignored: request already in flight");
                return SubmitOutcome::Skipped {
                    advisory: ADVISORY_IN_FLIGHT.to_string(),
                };
            }

            let doc = match inner.document.clone() {
                Some(doc) if document::instruction_is_usable(&inner.instruction) => doc,
                other => {
                    let advisory = if other.is_none() {
                        ADVISORY_NO_DOCUMENT
                    } else {
                        ADVISORY_NO_INSTRUCTION
                    };
                    inner.set_status(StatusKind::Advisory, advisory, &mut events);
                    drop(inner);
                    self.emit(events);
                    return SubmitOutcome::Skipped {
                        advisory: advisory.to_string(),
                    };
                }
            };

            self.errors.reset();
            inner.result = None;
            inner.set_progress(0, &mut events);
            inner.set_status(StatusKind::Info, STATUS_PROCESSING, &mut events);
            inner.set_state(ProcessingState::Submitting, &mut events);

            ProcessRequest {
                file_name: doc.name().to_string(),
                document: doc.shared_bytes(),
                instruction: inner.instruction.clone(),
            }
        };
        self.emit(std::mem::take(&mut events));

        // ── Step 2: The single suspension point ──────────────────────────
        let file_name = request.file_name.clone();
        info!("Submitting '{}'", file_name);
        let reply = AssertUnwindSafe(self.service.process(request))
            .catch_unwind()
            .await;

        // ── Step 3: Interpret and decode ─────────────────────────────────
        let decoded = match reply {
            Ok(Ok(reply)) => self.interpret(reply, &file_name),
            Ok(Err(e)) => Err(e),
            Err(payload) => Err(DocFlowError::Panicked(panic_message(payload.as_ref()))),
        };

        // ── Step 4: Land in a terminal state ─────────────────────────────
        let outcome = {
            let mut inner = self.lock();
            match decoded {
                Ok(result) => {
                    info!(
                        "Processed '{}' → '{}' ({} bytes) in {}ms",
                        file_name,
                        result.artifact.file_name,
                        result.artifact.bytes.len(),
                        start.elapsed().as_millis()
                    );
                    inner.result = Some(result);
                    inner.set_progress(100, &mut events);
                    inner.set_status(StatusKind::Success, STATUS_SUCCEEDED, &mut events);
                    inner.set_state(ProcessingState::Succeeded, &mut events);
                    SubmitOutcome::Succeeded
                }
                Err(e) => {
                    warn!("Processing '{}' failed: {}", file_name, e);
                    let reason = e.to_string();
                    self.record(ErrorRecord::from_error(PROCESS_ORIGIN, &e), &mut events);
                    inner.set_progress(0, &mut events);
                    inner.set_status(
                        StatusKind::Error,
                        format!("Error processing the document: {reason}. Check the error log."),
                        &mut events,
                    );
                    inner.set_state(ProcessingState::Failed, &mut events);
                    SubmitOutcome::Failed { reason }
                }
            }
        };
        self.emit(events);
        outcome
    }

    /// Map a raw reply onto a decoded result or a typed failure.
    fn interpret(&self, reply: ServiceReply, file_name: &str) -> Result<ProcessedResult, DocFlowError> {
        if !reply.is_success() {
            return Err(DocFlowError::Server {
                status: reply.status,
                message: decode::parse_failure_message(&reply.body),
            });
        }
        let response = decode::parse_success(&reply.body)?;
        decode::decode_response(response, file_name, &self.config.version_suffix)
    }

    // ── Download ─────────────────────────────────────────────────────────

    /// Save the processed document into `dir` under its versioned name.
    ///
    /// Without a result this is an advisory no-op, not an error.
    pub async fn trigger_download(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<DownloadOutcome, DocFlowError> {
        let mut events = Vec::new();
        let artifact = {
            let mut inner = self.lock();
            let current = inner.result.as_ref().map(|r| r.artifact.clone());
            match current {
                Some(artifact) => artifact,
                None => {
                    inner.set_status(StatusKind::Advisory, ADVISORY_NOTHING_TO_DOWNLOAD, &mut events);
                    drop(inner);
                    self.emit(events);
                    return Ok(DownloadOutcome::Unavailable {
                        advisory: ADVISORY_NOTHING_TO_DOWNLOAD.to_string(),
                    });
                }
            }
        };

        let dir = dir.as_ref().to_path_buf();
        let saved = tokio::task::spawn_blocking(move || download::save_artifact(&artifact, &dir))
            .await
            .map_err(|e| DocFlowError::Internal(format!("Download task panicked: {e}")))
            .and_then(|r| r);

        let outcome = {
            let mut inner = self.lock();
            match saved {
                Ok(path) => {
                    inner.set_status(
                        StatusKind::Success,
                        format!("Saved {}", path.display()),
                        &mut events,
                    );
                    Ok(DownloadOutcome::Saved(path))
                }
                Err(e) => {
                    self.record(ErrorRecord::from_error(DOWNLOAD_ORIGIN, &e), &mut events);
                    inner.set_status(
                        StatusKind::Error,
                        format!("Error saving the document: {e}"),
                        &mut events,
                    );
                    Err(e)
                }
            }
        };
        self.emit(events);
        outcome
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn state(&self) -> ProcessingState {
        self.lock().state
    }

    /// Progress indicator, 0 or 100.
    pub fn progress(&self) -> u8 {
        self.lock().progress
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.lock().status.clone()
    }

    pub fn document(&self) -> Option<SelectedDocument> {
        self.lock().document.clone()
    }

    pub fn instruction(&self) -> String {
        self.lock().instruction.clone()
    }

    pub fn result(&self) -> Option<ProcessedResult> {
        self.lock().result.clone()
    }

    /// Preview markup prepared for display per `config.sanitize_preview`.
    pub fn preview(&self) -> Option<String> {
        self.lock()
            .result
            .as_ref()
            .map(|r| preview::prepare(&r.preview, self.config.sanitize_preview))
    }

    /// Copy of the error log, oldest first.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.snapshot()
    }

    /// Handle to the error log this session writes to.
    pub fn error_log(&self) -> ErrorLog {
        self.errors.clone()
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, record: ErrorRecord, events: &mut Vec<Event>) {
        self.errors.record(record.clone());
        events.push(Event::Error(record));
    }

    fn emit(&self, events: Vec<Event>) {
        let Some(observer) = &self.observer else {
            return;
        };
        for event in events {
            match event {
                Event::State(from, to) => observer.on_state_change(from, to),
                Event::Progress(p) => observer.on_progress(p),
                Event::Status(s) => observer.on_status(&s),
                Event::Error(r) => observer.on_error_recorded(&r),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl DocumentService for Unreachable {
        async fn process(&self, _request: ProcessRequest) -> Result<ServiceReply, DocFlowError> {
            Err(DocFlowError::Network {
                endpoint: "http://127.0.0.1:9".into(),
                reason: "connection refused".into(),
            })
        }
    }

    fn session() -> Session {
        Session::with_service(WorkflowConfig::default(), Arc::new(Unreachable))
    }

    #[test]
    fn starts_idle_and_not_ready() {
        let s = session();
        assert_eq!(s.state(), ProcessingState::Idle);
        assert_eq!(s.progress(), 0);
        assert!(s.status().is_none());
        assert!(!s.is_ready());
    }

    #[test]
    fn readiness_needs_document_and_instruction() {
        let s = session();
        s.set_instruction("remove drafts");
        assert!(!s.is_ready());
        s.select_document(DocumentCandidate::new("a.docx", vec![1])).unwrap();
        assert!(s.is_ready());
        s.set_instruction("   ");
        assert!(!s.is_ready());
    }

    #[test]
    fn instruction_is_stored_verbatim() {
        let s = session();
        s.set_instruction("  keep my spaces \n");
        assert_eq!(s.instruction(), "  keep my spaces \n");
    }

    #[test]
    fn invalid_selection_clears_previous_document() {
        let s = session();
        s.select_document(DocumentCandidate::new("a.docx", vec![1])).unwrap();
        assert!(s.select_document(DocumentCandidate::new("a.pdf", vec![1])).is_err());
        assert!(s.document().is_none());
        assert_eq!(s.errors().len(), 1);
        assert_eq!(s.errors()[0].origin, SELECT_ORIGIN);
    }

    #[test]
    fn valid_selection_clears_error_log() {
        let s = session();
        let _ = s.select_document(DocumentCandidate::new("a.txt", vec![1]));
        assert_eq!(s.errors().len(), 1);
        s.select_document(DocumentCandidate::new("a.docx", vec![1])).unwrap();
        assert!(s.errors().is_empty());
        assert_eq!(s.status().unwrap().text, "Selected file: a.docx");
    }

    #[tokio::test]
    async fn transport_failure_lands_in_failed() {
        let s = session();
        s.select_document(DocumentCandidate::new("a.docx", vec![1])).unwrap();
        s.set_instruction("x");
        let outcome = s.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed { ref reason } if reason.contains("connection refused")));
        assert_eq!(s.state(), ProcessingState::Failed);
        assert_eq!(s.progress(), 0);
        assert_eq!(s.errors()[0].origin, PROCESS_ORIGIN);
    }

    #[tokio::test]
    async fn download_without_result_is_advisory() {
        let s = session();
        let dir = tempfile::tempdir().unwrap();
        let outcome = s.trigger_download(dir.path()).await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::Unavailable { .. }));
        assert_eq!(s.status().unwrap().kind, StatusKind::Advisory);
        assert!(s.errors().is_empty());
    }

    #[test]
    fn terminal_states() {
        assert!(ProcessingState::Succeeded.is_terminal());
        assert!(ProcessingState::Failed.is_terminal());
        assert!(!ProcessingState::Idle.is_terminal());
        assert!(!ProcessingState::Submitting.is_terminal());
    }
}
