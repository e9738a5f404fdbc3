//! Load diagnostics
//!
//! Everything the loader recovers from is reported through `tracing` and, when
//! [`ParseOptions::collect_warnings`](super::ParseOptions) is set, kept in a
//! list the caller can inspect after loading.

use std::fmt;

/// How bad a recovered problem was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Advisory: the file deviates from the format but nothing was lost
    Warning,
    /// Recorded error: a best-effort value replaced what the file declared
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One recovered problem
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Byte offset in the file, when the problem has one
    pub position: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{} at {}: {}", self.severity, position, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Per-document diagnostic sink
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    collect: bool,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(collect: bool) -> Self {
        Self {
            collect,
            items: Vec::new(),
        }
    }

    pub fn warn(&mut self, position: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        match position {
            Some(position) => tracing::warn!(position = position as u64, "{}", message),
            None => tracing::warn!("{}", message),
        }
        self.push(Severity::Warning, position, message);
    }

    pub fn error(&mut self, position: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        match position {
            Some(position) => tracing::error!(position = position as u64, "{}", message),
            None => tracing::error!("{}", message),
        }
        self.push(Severity::Error, position, message);
    }

    fn push(&mut self, severity: Severity, position: Option<usize>, message: String) {
        if self.collect {
            self.items.push(Diagnostic {
                severity,
                position,
                message,
            });
        }
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }
}
