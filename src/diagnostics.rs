//! Diagnostics: status events raised while resolving.
//!
//! Every event goes to `tracing`. It is also handed to an optional
//! consumer callback when its level clears the configured threshold, and
//! recorded in an [`EventList`] while recording is enabled.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

use crate::error::ResolveError;

// ============================================================================
// EVENT TYPES
// ============================================================================

/// Level of a status event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusLevel {
    Debug,
    Progress,
    Info,
    Warning,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusLevel::Debug => "debug",
            StatusLevel::Progress => "progress",
            StatusLevel::Info => "info",
            StatusLevel::Warning => "warning",
            StatusLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// A status event with the component that raised it and the corpus path it
/// is about.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEvent {
    pub level: StatusLevel,
    pub component: Arc<str>,
    /// Diagnostic code (e.g., "E0004").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub path: Arc<str>,
}

impl StatusEvent {
    pub fn new(
        level: StatusLevel,
        component: impl Into<Arc<str>>,
        message: impl Into<Arc<str>>,
        path: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            level,
            component: component.into(),
            code: None,
            message: message.into(),
            path: path.into(),
        }
    }

    /// Set the diagnostic code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Codes attached to reported problems.
pub mod codes {
    /// An import could not be loaded.
    pub const MISSING_IMPORT: &str = "E0001";
    /// The same path was declared twice in one document.
    pub const DUPLICATE_DECLARATION: &str = "E0002";
    /// A reference did not resolve.
    pub const UNRESOLVED_REFERENCE: &str = "E0003";
    /// A reference resolved to an object of the wrong kind.
    pub const KIND_MISMATCH: &str = "E0004";
    /// Absolute symbol references are not supported.
    pub const ABSOLUTE_REFERENCE: &str = "E0005";
    /// A required trait parameter has no value.
    pub const MISSING_REQUIRED_ARGUMENT: &str = "E0006";
    /// No adapter is mounted for a namespace.
    pub const ADAPTER_NOT_FOUND: &str = "E0007";
    /// An argument could not be matched to a parameter.
    pub const PARAMETER_RESOLUTION: &str = "E0008";
    /// An argument value does not match its parameter's data type.
    pub const PARAMETER_TYPE: &str = "E0009";
    /// An object failed its integrity check.
    pub const INTEGRITY_CHECK: &str = "E0010";
    /// A top-level resolution was started while another was running.
    pub const REENTRANT_RESOLUTION: &str = "E0011";
    /// The pipeline was asked to run an unknown step.
    pub const INVALID_STAGE: &str = "E0012";
    /// An object path did not match anything in a loaded document.
    pub const OBJECT_NOT_FOUND: &str = "E0013";
    /// An entity has no trait naming its identifying attribute.
    pub const MISSING_PRIMARY_KEY: &str = "E0014";
}

// ============================================================================
// EVENT LIST
// ============================================================================

/// Recorder for events raised during an API call, for inspection after the
/// call returns.
///
/// Recording nests: only the outermost `enable` clears previous events and
/// only the matching outermost `disable` stops recording.
#[derive(Clone, Debug, Default)]
pub struct EventList {
    is_recording: bool,
    nesting_level: u32,
    items: Vec<StatusEvent>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        if self.nesting_level == 0 {
            self.items.clear();
            self.is_recording = true;
        }
        self.nesting_level += 1;
    }

    pub fn disable(&mut self) {
        self.nesting_level = self.nesting_level.saturating_sub(1);
        if self.nesting_level == 0 {
            self.is_recording = false;
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn push(&mut self, event: StatusEvent) {
        if self.is_recording {
            self.items.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEvent> {
        self.items.iter()
    }

    pub fn take(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.items)
    }
}

// ============================================================================
// REPORTER
// ============================================================================

/// Consumer-supplied event sink.
pub type EventCallback = Box<dyn Fn(&StatusEvent)>;

/// Routes events to tracing, the callback, and the event list.
///
/// Resolution is single-threaded and passes report through shared borrows,
/// so state lives in `Cell`/`RefCell`.
#[derive(Default)]
pub struct Reporter {
    callback: Option<EventCallback>,
    report_at_level: Cell<Option<StatusLevel>>,
    events: RefCell<EventList>,
    error_count: Cell<usize>,
    warning_count: Cell<usize>,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("has_callback", &self.callback.is_some())
            .field("report_at_level", &self.report_at_level())
            .field("error_count", &self.error_count.get())
            .field("warning_count", &self.warning_count.get())
            .finish()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the event sink. Events below `level` are not delivered to it.
    pub fn set_event_callback(&mut self, callback: EventCallback, level: StatusLevel) {
        self.callback = Some(callback);
        self.report_at_level.set(Some(level));
    }

    pub fn report_at_level(&self) -> StatusLevel {
        self.report_at_level.get().unwrap_or(StatusLevel::Info)
    }

    pub fn report(&self, event: StatusEvent) {
        let code = event.code.as_deref().unwrap_or("");
        let (component, path, message) = (&*event.component, &*event.path, &*event.message);
        match event.level {
            StatusLevel::Error => {
                self.error_count.set(self.error_count.get() + 1);
                tracing::error!(component, code, path, "{message}");
            }
            StatusLevel::Warning => {
                self.warning_count.set(self.warning_count.get() + 1);
                tracing::warn!(component, code, path, "{message}");
            }
            StatusLevel::Info => tracing::info!(component, path, "{message}"),
            StatusLevel::Progress | StatusLevel::Debug => tracing::debug!(component, path, "{message}"),
        }

        if let Some(callback) = &self.callback {
            if event.level >= self.report_at_level() {
                callback(&event);
            }
        }

        if event.level >= StatusLevel::Warning || event.code.is_some() {
            self.events.borrow_mut().push(event);
        }
    }

    pub fn debug(&self, component: &str, message: impl Into<Arc<str>>, path: impl Into<Arc<str>>) {
        self.report(StatusEvent::new(StatusLevel::Debug, component, message, path));
    }

    pub fn info(&self, component: &str, message: impl Into<Arc<str>>, path: impl Into<Arc<str>>) {
        self.report(StatusEvent::new(StatusLevel::Info, component, message, path));
    }

    pub fn warning(&self, component: &str, message: impl Into<Arc<str>>, path: impl Into<Arc<str>>) {
        self.report(StatusEvent::new(StatusLevel::Warning, component, message, path));
    }

    pub fn error(&self, component: &str, message: impl Into<Arc<str>>, path: impl Into<Arc<str>>) {
        self.report(StatusEvent::new(StatusLevel::Error, component, message, path));
    }

    /// Report a resolution error at its default level.
    pub fn report_error(&self, component: &str, err: &ResolveError, path: impl Into<Arc<str>>) {
        self.report_error_at(component, err, err.level(), path);
    }

    /// Report a resolution error at an explicit level.
    pub fn report_error_at(
        &self,
        component: &str,
        err: &ResolveError,
        level: StatusLevel,
        path: impl Into<Arc<str>>,
    ) {
        self.report(StatusEvent::new(level, component, err.to_string(), path).with_code(err.code()));
    }

    pub fn enable_recording(&self) {
        self.events.borrow_mut().enable();
    }

    pub fn disable_recording(&self) {
        self.events.borrow_mut().disable();
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.borrow().iter().cloned().collect()
    }

    pub fn take_events(&self) -> Vec<StatusEvent> {
        self.events.borrow_mut().take()
    }

    pub fn error_count(&self) -> usize {
        self.error_count.get()
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count.get()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count.get() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_event_list_nesting() {
        let mut list = EventList::new();
        list.enable();
        list.push(StatusEvent::new(StatusLevel::Error, "c", "first", ""));
        list.enable();
        // Nested enable must not clear.
        assert_eq!(list.len(), 1);
        list.disable();
        assert!(list.is_recording());
        list.disable();
        assert!(!list.is_recording());
        list.push(StatusEvent::new(StatusLevel::Error, "c", "dropped", ""));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_reporter_counts() {
        let reporter = Reporter::new();
        reporter.error("corpus", "bad", "/a");
        reporter.warning("corpus", "meh", "/a");
        reporter.info("corpus", "fine", "/a");

        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.warning_count(), 1);
        assert!(reporter.has_errors());
    }

    #[test]
    fn test_callback_respects_level() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut reporter = Reporter::new();
        reporter.set_event_callback(
            Box::new(move |e: &StatusEvent| sink.borrow_mut().push(e.message.to_string())),
            StatusLevel::Warning,
        );

        reporter.info("corpus", "quiet", "");
        reporter.warning("corpus", "loud", "");

        assert_eq!(*seen.borrow(), vec!["loud".to_string()]);
    }

    #[test]
    fn test_recording_keeps_coded_events() {
        let reporter = Reporter::new();
        reporter.enable_recording();
        reporter.report_error("corpus", &ResolveError::TooManyArguments, "/a/t");
        reporter.info("corpus", "noise", "");
        reporter.disable_recording();

        let events = reporter.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code.as_deref(), Some(codes::PARAMETER_RESOLUTION));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_event_serde_round_trip() {
        let event = StatusEvent::new(StatusLevel::Warning, "Corpus", "missing", "local:/A.cdm.json")
            .with_code(codes::MISSING_IMPORT);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"E0001\""));
        let back: StatusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
