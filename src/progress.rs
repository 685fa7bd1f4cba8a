//! Observer trait for session events.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via [`crate::Session::with_observer`]
//! to follow a session as it moves through its states. The CLI uses this to
//! drive its spinner; a GUI host would repaint from the same events.
//!
//! # Example
//!
//! ```rust
//! use docx_reformat::{ProcessingState, WorkflowObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     transitions: AtomicUsize,
//! }
//!
//! impl WorkflowObserver for CountingObserver {
//!     fn on_state_change(&self, _from: ProcessingState, to: ProcessingState) {
//!         self.transitions.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("now {to:?}");
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { transitions: AtomicUsize::new(0) });
//! let _as_dyn: Arc<dyn WorkflowObserver> = observer;
//! ```

use crate::errlog::ErrorRecord;
use crate::session::{ProcessingState, StatusMessage};
use std::sync::Arc;

/// Receives session events.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about. Events are
/// delivered after the session lock is released, in the order they happened.
pub trait WorkflowObserver: Send + Sync {
    /// The processing state changed.
    fn on_state_change(&self, from: ProcessingState, to: ProcessingState) {
        let _ = (from, to);
    }

    /// The progress indicator moved (0 or 100).
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// The user-visible status line changed.
    fn on_status(&self, status: &StatusMessage) {
        let _ = status;
    }

    /// A failure was appended to the error log.
    fn on_error_recorded(&self, record: &ErrorRecord) {
        let _ = record;
    }
}

/// A no-op implementation for hosts that don't need events.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::Session`].
pub type SharedObserver = Arc<dyn WorkflowObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StatusKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingObserver {
        states: AtomicUsize,
        progress: AtomicUsize,
        statuses: AtomicUsize,
        errors: AtomicUsize,
    }

    impl WorkflowObserver for TrackingObserver {
        fn on_state_change(&self, _from: ProcessingState, _to: ProcessingState) {
            self.states.fetch_add(1, Ordering::SeqCst);
        }

        fn on_progress(&self, percent: u8) {
            self.progress.store(percent as usize, Ordering::SeqCst);
        }

        fn on_status(&self, _status: &StatusMessage) {
            self.statuses.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error_recorded(&self, _record: &ErrorRecord) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_state_change(ProcessingState::Idle, ProcessingState::Submitting);
        o.on_progress(100);
        o.on_status(&StatusMessage::new(StatusKind::Info, "hi"));
        o.on_error_recorded(&ErrorRecord::new("processDocument", "boom"));
    }

    #[test]
    fn tracking_observer_receives_events() {
        let t = TrackingObserver::default();
        t.on_state_change(ProcessingState::Idle, ProcessingState::Submitting);
        t.on_state_change(ProcessingState::Submitting, ProcessingState::Succeeded);
        t.on_progress(100);
        t.on_status(&StatusMessage::new(StatusKind::Success, "done"));
        t.on_error_recorded(&ErrorRecord::new("processDocument", "boom"));

        assert_eq!(t.states.load(Ordering::SeqCst), 2);
        assert_eq!(t.progress.load(Ordering::SeqCst), 100);
        assert_eq!(t.statuses.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: SharedObserver = Arc::new(NoopObserver);
        o.on_progress(0);
    }
}
