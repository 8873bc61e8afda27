//! Diagnostic output
//!
//! Every user-facing message in the sensor flows through the
//! [`DiagnosticSink`] trait, so callers choose whether diagnostics are
//! printed, collected, or asserted on.

use parking_lot::Mutex;

/// Destination for user-facing diagnostic messages.
pub trait DiagnosticSink {
    /// Emits one plain-text diagnostic message.
    fn message(&self, message: &str);
}

/// A shared sink handle is itself a sink, so a caller can keep one end and
/// hand the other to a run.
impl<T: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<T> {
    fn message(&self, message: &str) {
        (**self).message(message);
    }
}

/// Sink that prints diagnostics to the console, coloring error messages when
/// attached to a terminal.
pub struct ConsoleSink {
    show_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for ConsoleSink {
    fn message(&self, message: &str) {
        if message.starts_with("Error") {
            println!("{}", self.colorize(message, "31"));
        } else {
            println!("{}", message);
        }
    }
}

/// Sink that collects diagnostics in memory, for tests and embedders.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message emitted so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Returns true if any collected message contains `fragment`.
    pub fn contains(&self, fragment: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(fragment))
    }
}

impl DiagnosticSink for CollectingSink {
    fn message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
