//! Error aggregation: the ordered log the user inspects after a failure.
//!
//! Two producers feed one [`ErrorLog`]:
//!
//! 1. The session, which records validation and processing failures with an
//!    origin such as `"selectDocument"` or `"processDocument"`.
//! 2. An [`UncaughtSubscription`], which installs a process panic hook and
//!    turns every panic into a record with origin `"uncaught"`.
//!
//! The log is append-only between resets. Entries keep the order in which
//! they were recorded and are never deduplicated.

use crate::error::DocFlowError;
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

/// Origin used for records produced by the panic hook.
pub const UNCAUGHT_ORIGIN: &str = "uncaught";

/// Stack trace placeholder when the host cannot supply one.
pub const NO_STACK_TRACE: &str = "no stack trace available";

/// Where a failure was raised, when the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One entry in the error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Operation or channel that produced the failure.
    pub origin: String,
    pub stack_trace: Option<String>,
    pub location: Option<SourceLocation>,
}

impl ErrorRecord {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: origin.into(),
            stack_trace: None,
            location: None,
        }
    }

    /// Build a record from a library error, keeping its full source chain.
    pub fn from_error(origin: impl Into<String>, err: &DocFlowError) -> Self {
        let mut record = Self::new(origin, err.to_string());
        let mut chain = Vec::new();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        if !chain.is_empty() {
            record.stack_trace = Some(chain.join("\n"));
        }
        record
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Shared, ordered error log. Cloning yields another handle to the same log.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Arc<Mutex<Vec<ErrorRecord>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: ErrorRecord) {
        debug!("Recording error from {}: {}", entry.origin, entry.message);
        self.lock().push(entry);
    }

    /// Drop every entry.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while the lock is held still leaves a usable Vec.
    fn lock(&self) -> MutexGuard<'_, Vec<ErrorRecord>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Uncaught-error subscription ──────────────────────────────────────────

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

static SUBSCRIBED: AtomicBool = AtomicBool::new(false);

/// Owned subscription to process-wide panics.
///
/// Acquire it once at startup with [`UncaughtSubscription::install`] and keep
/// it alive for as long as the host runs. Dropping it stops recording and
/// restores the hook that was installed before. A subscription dropped while
/// its thread unwinds cannot swap the hook back; it stays in the chain as a
/// pass-through. At most one subscription exists at a time.
pub struct UncaughtSubscription {
    previous: Option<Arc<PanicHook>>,
    /// Cleared on drop; the hook records only while it is set.
    active: Arc<AtomicBool>,
}

impl UncaughtSubscription {
    /// Install the panic hook, forwarding every panic into `log`.
    ///
    /// The previously installed hook still runs after the record is
    /// appended, so the default panic message keeps reaching stderr.
    pub fn install(log: ErrorLog) -> Result<Self, DocFlowError> {
        if SUBSCRIBED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DocFlowError::AlreadySubscribed);
        }

        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous);
        let active = Arc::new(AtomicBool::new(true));
        let recording = Arc::clone(&active);
        panic::set_hook(Box::new(move |info| {
            if recording.load(Ordering::Acquire) {
                let record = record_from_panic(info);
                error!("Uncaught failure: {}", record.message);
                log.record(record);
            }
            (**chained)(info);
        }));

        debug!("Uncaught-error subscription installed");
        Ok(Self {
            previous: Some(previous),
            active,
        })
    }

    /// True while a subscription is installed somewhere in the process.
    pub fn is_active() -> bool {
        SUBSCRIBED.load(Ordering::Acquire)
    }
}

impl Drop for UncaughtSubscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        // `take_hook` panics on a panicking thread. The hook stays in the
        // chain but only forwards to `previous` from now on.
        if std::thread::panicking() {
            SUBSCRIBED.store(false, Ordering::Release);
            debug!("Uncaught-error subscription deactivated during unwind");
            return;
        }
        // Dropping our hook releases its clone of `previous`.
        drop(panic::take_hook());
        if let Some(previous) = self.previous.take() {
            match Arc::try_unwrap(previous) {
                Ok(hook) => panic::set_hook(hook),
                Err(shared) => panic::set_hook(Box::new(move |info| (**shared)(info))),
            }
        }
        SUBSCRIBED.store(false, Ordering::Release);
        debug!("Uncaught-error subscription removed");
    }
}

/// Normalise a panic into an [`ErrorRecord`].
fn record_from_panic(info: &PanicHookInfo<'_>) -> ErrorRecord {
    let message = panic_message(info.payload());

    let backtrace = Backtrace::capture();
    let stack_trace = match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => NO_STACK_TRACE.to_string(),
    };

    let mut record = ErrorRecord::new(UNCAUGHT_ORIGIN, message).with_stack_trace(stack_trace);
    if let Some(loc) = info.location() {
        record = record.with_location(SourceLocation {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
        });
    }
    record
}

/// Extract the human-readable text from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_insertion_order() {
        let log = ErrorLog::new();
        log.record(ErrorRecord::new("processDocument", "E1"));
        log.record(ErrorRecord::new("processDocument", "E2"));
        let messages: Vec<_> = log.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["E1", "E2"]);
    }

    #[test]
    fn identical_records_are_not_deduplicated() {
        let log = ErrorLog::new();
        let r = ErrorRecord::new("selectDocument", "same");
        log.record(r.clone());
        log.record(r);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn reset_clears_every_handle() {
        let log = ErrorLog::new();
        let other = log.clone();
        log.record(ErrorRecord::new("x", "y"));
        assert_eq!(other.len(), 1);
        other.reset();
        assert!(log.is_empty());
    }

    #[test]
    fn from_error_carries_source_chain() {
        let err = DocFlowError::OutputWriteFailed {
            path: "/tmp/out.docx".into(),
            source: std::io::Error::other("disk full"),
        };
        let r = ErrorRecord::from_error("triggerDownload", &err);
        assert_eq!(r.origin, "triggerDownload");
        assert!(r.stack_trace.as_deref().unwrap_or("").contains("disk full"));
    }

    #[test]
    fn panic_message_handles_both_string_kinds() {
        let a: Box<dyn std::any::Any + Send> = Box::new("static text");
        let b: Box<dyn std::any::Any + Send> = Box::new(String::from("owned text"));
        let c: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(a.as_ref()), "static text");
        assert_eq!(panic_message(b.as_ref()), "owned text");
        assert!(panic_message(c.as_ref()).contains("non-string"));
    }

    #[test]
    fn location_display() {
        let loc = SourceLocation {
            file: "src/main.rs".into(),
            line: 10,
            column: 5,
        };
        assert_eq!(loc.to_string(), "src/main.rs:10:5");
    }
}
