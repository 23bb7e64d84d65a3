use crate::core::terminal::{print_error, print_info, print_success, print_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Where operator-facing progress and outcome lines go.
pub trait StatusReporter: Send + Sync {
    fn report(&self, level: StatusLevel, message: &str);
}

pub struct TerminalReporter;

impl StatusReporter for TerminalReporter {
    fn report(&self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Info => print_info(message),
            StatusLevel::Success => print_success(message),
            StatusLevel::Warning => print_warn(message),
            StatusLevel::Error => print_error(message),
        }
    }
}

/// Keeps every reported line, for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingReporter {
    lines: std::sync::Mutex<Vec<(StatusLevel, String)>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn lines(&self) -> Vec<(StatusLevel, String)> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<(StatusLevel, String)> {
        self.lines().pop()
    }
}

#[cfg(test)]
impl StatusReporter for RecordingReporter {
    fn report(&self, level: StatusLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, message.to_string()));
    }
}
