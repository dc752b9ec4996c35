//! Diagnostic sinks.
//!
//! The host of the compiler (a derive macro, a build script, a test) decides
//! where diagnostics end up; the core only hands them over.

use tracing::error;

use crate::error::{Diagnostic, ExtractionError, ValidationError};

/// Receives diagnostics one at a time.
pub trait DiagnosticSink {
    /// Records one diagnostic.
    fn report(&mut self, diagnostic: &Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

/// Logs every diagnostic as a `tracing` error event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::Extraction(err) => {
                error!(kind = "extraction", field = %err.field(), "{err}");
            }
            Diagnostic::Validation(err) => {
                error!(kind = "validation", table = %err.table(), "{err}");
            }
            Diagnostic::Compilation(err) => {
                error!(kind = "compilation", "{err}");
            }
        }
    }
}

/// Counts diagnostics by kind; handy for build summaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountingSink {
    /// Extraction errors seen.
    pub extraction: usize,
    /// Validation errors seen.
    pub validation: usize,
    /// Compilation errors seen.
    pub compilation: usize,
}

impl DiagnosticSink for CountingSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::Extraction(_) => self.extraction += 1,
            Diagnostic::Validation(_) => self.validation += 1,
            Diagnostic::Compilation(_) => self.compilation += 1,
        }
    }
}

impl CountingSink {
    /// Total number of diagnostics seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.extraction + self.validation + self.compilation
    }
}

impl From<&ExtractionError> for Diagnostic {
    fn from(err: &ExtractionError) -> Self {
        Self::Extraction(err.clone())
    }
}

impl From<&ValidationError> for Diagnostic {
    fn from(err: &ValidationError) -> Self {
        Self::Validation(err.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(ValidationError::NoColumnDefined {
            table: "A".to_string(),
        });
        diagnostics.push(ValidationError::NoColumnDefined {
            table: "B".to_string(),
        });

        let mut sink: Vec<Diagnostic> = Vec::new();
        diagnostics.emit_to(&mut sink);
        assert_eq!(sink.len(), 2);
        assert!(sink[0].to_string().ends_with("in A"));
        assert!(sink[1].to_string().ends_with("in B"));
    }

    #[test]
    fn test_counting_sink() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(&ExtractionError::UnknownHelper {
            model: "M".to_string(),
            field: "f".to_string(),
            value: "like".to_string(),
        });
        diagnostics.push(ValidationError::NoColumnDefined {
            table: "M".to_string(),
        });

        let mut sink = CountingSink::default();
        diagnostics.emit_to(&mut sink);
        assert_eq!(sink.extraction, 1);
        assert_eq!(sink.validation, 1);
        assert_eq!(sink.total(), 2);

        diagnostics.emit_to(&mut TracingSink);
    }
}
