//! Per-record diagnostics.
//!
//! Conversion never stops for a defect that only affects one record. Such
//! defects, and informational notes about escaped or truncated content, are
//! handed to a [`DiagnosticSink`] and processing continues.
//!
//! ```
//! use nvram_core::diag::{Diagnostic, Location};
//! use nvram_core::text;
//!
//! let mut diagnostics: Vec<Diagnostic> = Vec::new();
//! let records = text::parse(b"broken line\nwl_ssid=MyNet\n", &mut diagnostics);
//!
//! assert_eq!(records.len(), 1);
//! assert_eq!(diagnostics[0].location, Location::Line(1));
//! ```

use crate::error::Error;
use std::fmt;
use tracing::{error, info, warn};

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Nothing is wrong, but the content deserves a look
    Info,
    /// Output is incomplete
    Warning,
    /// A record was dropped
    Error,
}

/// Where in the input a diagnostic applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 1-based physical line of a text file
    Line(usize),
    /// 1-based record number of a binary image
    Record(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(n) => write!(f, "line {}", n),
            Location::Record(n) => write!(f, "record {}", n),
        }
    }
}

/// A single report about one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Position in the input
    pub location: Location,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Creates a new diagnostic
    pub fn new(severity: Severity, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity,
            location,
            message: message.into(),
        }
    }

    /// Wraps a recoverable parse error for a text line
    pub fn skipped_line(line: usize, err: &Error) -> Self {
        Self::new(Severity::Error, Location::Line(line), err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Receiver for diagnostics produced during a conversion
pub trait DiagnosticSink {
    /// Accept one diagnostic
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// A sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to `tracing`, tagged with the file they came from.
///
/// Keeps per-severity counts so callers can summarize a run.
#[derive(Debug)]
pub struct TracingSink<'a> {
    file: &'a str,
    /// Number of [`Severity::Info`] diagnostics seen
    pub infos: usize,
    /// Number of [`Severity::Warning`] diagnostics seen
    pub warnings: usize,
    /// Number of [`Severity::Error`] diagnostics seen
    pub errors: usize,
}

impl<'a> TracingSink<'a> {
    /// Creates a sink for diagnostics about `file`
    pub fn new(file: &'a str) -> Self {
        Self {
            file,
            infos: 0,
            warnings: 0,
            errors: 0,
        }
    }
}

impl DiagnosticSink for TracingSink<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        let file = self.file;
        match diagnostic.severity {
            Severity::Info => {
                self.infos += 1;
                info!(file, "{}", diagnostic);
            }
            Severity::Warning => {
                self.warnings += 1;
                warn!(file, "{}", diagnostic);
            }
            Severity::Error => {
                self.errors += 1;
                error!(file, "{}", diagnostic);
            }
        }
    }
}
