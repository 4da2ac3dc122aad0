//! Parse warnings
//!
//! Malformed input is usually repaired rather than rejected. Every repair is
//! reported through `tracing` and, when [`ParseOptions::collect_warnings`] is
//! set, kept in a bounded list the caller can inspect afterwards.

use super::ParseOptions;
use std::fmt;

/// What kind of repair a warning reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    BadNumber,
    MalformedString,
    InvalidHexCharacter,
    MalformedName,
    NameTooLong,
    MalformedDictionary,
    BadStreamLength,
    StreamLengthMismatch,
    TruncatedEndstream,
    EmptyStream,
    UnsupportedFilter,
    InvalidStream,
    InlineImageEnd,
    InvalidLinearization,
    MissingEndobj,
    InvalidObject,
}

/// A single recovered problem
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub kind: WarningKind,
    /// Byte offset in the source, when known
    pub position: Option<usize>,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} (at {})", self.message, pos),
            None => f.write_str(&self.message),
        }
    }
}

/// Warning sink shared by the lexer and the parser
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    collect: bool,
    limit: usize,
    warnings: Vec<ParseWarning>,
    dropped: usize,
}

impl Diagnostics {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            collect: options.collect_warnings,
            limit: options.max_warnings,
            warnings: Vec::new(),
            dropped: 0,
        }
    }

    /// Record a recoverable problem at warning level.
    pub fn warn(&mut self, kind: WarningKind, position: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?kind, ?position, "{}", message);
        self.record(kind, position, message);
    }

    /// Record a tolerated irregularity that most files in the wild exhibit.
    pub fn info(&mut self, kind: WarningKind, position: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(?kind, ?position, "{}", message);
        self.record(kind, position, message);
    }

    fn record(&mut self, kind: WarningKind, position: Option<usize>, message: String) {
        if !self.collect {
            return;
        }
        if self.warnings.len() < self.limit {
            self.warnings.push(ParseWarning {
                kind,
                position,
                message,
            });
        } else {
            self.dropped += 1;
        }
    }

    /// Take over warnings already reported by another sink.
    pub fn merge(&mut self, warnings: Vec<ParseWarning>) {
        for warning in warnings {
            self.record(warning.kind, warning.position, warning.message);
        }
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Number of warnings past the collection limit
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    /// Drain the collected warnings.
    pub fn take(&mut self) -> Vec<ParseWarning> {
        self.dropped = 0;
        std::mem::take(&mut self.warnings)
    }
}
