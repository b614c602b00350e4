//! User-visible notifications, the CLI analog of the web app's snackbar.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Prints colored one-liners to stderr so they never mix with data output.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success => eprintln!("\x1b[1;32m✅ {}\x1b[0m", message),
            Severity::Info => eprintln!("\x1b[36m{}\x1b[0m", message),
            Severity::Warning => eprintln!("\x1b[33m⚠ {}\x1b[0m", message),
            Severity::Error => eprintln!("\x1b[1;31m✗ {}\x1b[0m", message),
        }
    }
}

/// Collects notifications instead of printing them. Used by tests and any
/// headless embedding that wants to surface them elsewhere.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<(String, Severity)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Severity)> {
        self.entries.lock().unwrap().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.entries
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify("first", Severity::Info);
        notifier.notify("second", Severity::Error);
        let entries = notifier.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("first".to_string(), Severity::Info));
        assert_eq!(entries[1], ("second".to_string(), Severity::Error));
    }
}
