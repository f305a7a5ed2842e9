// Optional per-record validation
//
// Anomalies are delivered to an injected sink as structured issues; the reader
// never aborts and never looks at what the sink does with them.

use crate::core::{FieldKind, FieldSpan};
use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Field count differs from the first record's.
    FieldCountMismatch,
    /// Data after a closing quote.
    MalformedQuote,
    /// Quoted field still open at end of record.
    UnterminatedQuote,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::FieldCountMismatch => "field count mismatch",
            IssueKind::MalformedQuote => "malformed quote",
            IssueKind::UnterminatedQuote => "unterminated quote",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    /// Physical line the record starts on.
    pub line_number: u64,
    /// Offending field, when the issue concerns one field.
    pub field_index: Option<usize>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.message)?;
        if let Some(index) = self.field_index {
            write!(f, " (field {index})")?;
        }
        Ok(())
    }
}

/// Receiver for validation issues.
pub trait ValidationSink {
    fn report(&mut self, issue: ValidationIssue);
}

impl<F: FnMut(ValidationIssue)> ValidationSink for F {
    fn report(&mut self, issue: ValidationIssue) {
        self(issue)
    }
}

/// Sink collecting issues into a shared list. Clones share the list, so the
/// caller keeps one handle while the reader owns another.
#[derive(Debug, Clone, Default)]
pub struct ValidationCollector {
    issues: Arc<Mutex<Vec<ValidationIssue>>>,
}

impl ValidationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.issues.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.issues.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.lock().is_empty()
    }

    pub fn take(&self) -> Vec<ValidationIssue> {
        std::mem::take(&mut *self.issues.lock())
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.lock().iter().filter(|i| i.kind == kind).count()
    }
}

impl ValidationSink for ValidationCollector {
    fn report(&mut self, issue: ValidationIssue) {
        self.issues.lock().push(issue);
    }
}

/// Reader-side state: the expected field count, fixed by the first record.
#[derive(Default)]
pub(crate) struct Validator {
    expected_fields: Option<usize>,
}

impl Validator {
    pub(crate) fn reset(&mut self) {
        self.expected_fields = None;
    }

    pub(crate) fn check(&mut self, spans: &[FieldSpan], line_number: u64, sink: &mut dyn ValidationSink) {
        let count = spans.len();
        match self.expected_fields {
            None => self.expected_fields = Some(count),
            Some(expected) if expected != count => emit(
                sink,
                ValidationIssue {
                    kind: IssueKind::FieldCountMismatch,
                    message: format!("expected {expected} fields, found {count}"),
                    line_number,
                    field_index: None,
                },
            ),
            Some(_) => {}
        }

        for (index, span) in spans.iter().enumerate() {
            let (kind, message) = match span.kind {
                FieldKind::Malformed => (IssueKind::MalformedQuote, "data after closing quote"),
                FieldKind::Unterminated => (IssueKind::UnterminatedQuote, "quoted field is never closed"),
                _ => continue,
            };
            emit(
                sink,
                ValidationIssue {
                    kind,
                    message: message.to_string(),
                    line_number,
                    field_index: Some(index),
                },
            );
        }
    }
}

fn emit(sink: &mut dyn ValidationSink, issue: ValidationIssue) {
    trace!("validation: {issue}");
    sink.report(issue);
}
