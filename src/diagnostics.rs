//! Diagnostics for recoverable parse anomalies.
//!
//! Every declaration the scanner identifies produces exactly one symbol
//! (possibly degraded) or one diagnostic explaining why not. Diagnostics
//! never abort a run; they accumulate in a per-unit [`DiagnosticSink`]
//! owned exclusively by that unit's pipeline.

use smol_str::SmolStr;
use text_size::TextRange;
use thiserror::Error;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// A hard error; the affected symbol is degraded or missing.
    #[default]
    Error,
    /// A recoverable anomaly; the model is still complete.
    Warning,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Categorized diagnostic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DiagnosticKind {
    /// Unterminated literal or comment; fatal for the rest of that token
    /// stream only.
    #[error("lex error")]
    Lex,
    /// Unmatched brace/paren/angle bracket; recovered by closing all open
    /// scopes at end of input.
    #[error("scope imbalance")]
    ScopeImbalance,
    /// A signature fragment that could not be balanced; a best-effort
    /// symbol is retained.
    #[error("signature parse failure")]
    SignatureParse,
    /// Non-overloadable kinds sharing a name in one scope; the later
    /// declaration wins for lookup.
    #[error("duplicate name conflict")]
    DuplicateName,
    /// A `@copydoc` reference whose target was not found, was ambiguous,
    /// or formed a cycle; the comment is left empty.
    #[error("unresolved copydoc")]
    UnresolvedCopydoc,
    /// An `#error` preprocessor line; recorded, never aborts the scan.
    #[error("preprocessor error directive")]
    PreprocessorError,
}

/// A single recorded anomaly with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// 0-indexed source line.
    pub line: u32,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    /// A warning built outside any sink, e.g. during the cross-unit
    /// copydoc pass where the owning unit is only known by index.
    pub fn warning(
        kind: DiagnosticKind,
        line: u32,
        range: TextRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            line,
            range,
            message: message.into(),
        }
    }

    /// Format the diagnostic for display, e.g. for log output.
    pub fn format(&self) -> String {
        format!(
            "{}: {} (line {}): {}",
            self.severity.as_str(),
            self.kind,
            self.line + 1,
            self.message
        )
    }
}

/// Per-unit accumulator for diagnostics.
///
/// Each input unit owns its sink exclusively, so no locking is needed when
/// units are processed in parallel.
#[derive(Debug)]
pub struct DiagnosticSink {
    unit: SmolStr,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new(unit: impl Into<SmolStr>) -> Self {
        Self {
            unit: unit.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn error(
        &mut self,
        kind: DiagnosticKind,
        line: u32,
        range: TextRange,
        message: impl Into<String>,
    ) {
        self.push(Severity::Error, kind, line, range, message);
    }

    pub fn warning(
        &mut self,
        kind: DiagnosticKind,
        line: u32,
        range: TextRange,
        message: impl Into<String>,
    ) {
        self.push(Severity::Warning, kind, line, range, message);
    }

    fn push(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        line: u32,
        range: TextRange,
        message: impl Into<String>,
    ) {
        let message = message.into();
        tracing::debug!(
            unit = %self.unit,
            kind = %kind,
            line = line + 1,
            "{}: {message}",
            severity.as_str()
        );
        self.diagnostics.push(Diagnostic {
            severity,
            kind,
            line,
            range,
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    #[test]
    fn test_severity() {
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
        assert_eq!(Severity::Warning.as_str(), "warning");
    }

    #[test]
    fn test_sink_accumulates_in_order() {
        let mut sink = DiagnosticSink::new("coffee.h");
        let range = TextRange::empty(TextSize::new(0));
        sink.warning(DiagnosticKind::PreprocessorError, 3, range, "#error hit");
        sink.error(DiagnosticKind::ScopeImbalance, 9, range, "unmatched '{'");

        let recorded: Vec<_> = sink.iter().map(|d| d.kind).collect();
        assert_eq!(
            recorded,
            vec![
                DiagnosticKind::PreprocessorError,
                DiagnosticKind::ScopeImbalance
            ]
        );
        assert_eq!(sink.unit(), "coffee.h");
    }

    #[test]
    fn test_format() {
        let diag = Diagnostic {
            severity: Severity::Error,
            kind: DiagnosticKind::UnresolvedCopydoc,
            line: 0,
            range: TextRange::empty(TextSize::new(5)),
            message: "no symbol named `set_heat`".into(),
        };
        let formatted = diag.format();
        assert!(formatted.contains("unresolved copydoc"));
        assert!(formatted.contains("line 1"));
    }
}
