use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors stored before the front end stops collecting.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Scope,
    Structure,
}

/// Numeric diagnostic code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const UNTERMINATED_COMMENT: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);
    pub const UNEXPECTED_CHARACTER: Self = Self(104);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(110);
    pub const MISSING_INITIALIZER: Self = Self(111);

    // ── Scope errors (E500–E599) ──
    pub const AWAIT_OUTSIDE_ASYNC: Self = Self(500);
    pub const RETURN_OUTSIDE_FUNCTION: Self = Self(501);
    pub const BREAK_OUTSIDE_LOOP: Self = Self(502);
    pub const DUPLICATE_FUNCTION: Self = Self(503);

    // ── Structure errors (E600–E699) ──
    pub const MISSING_ENTRY_POINT: Self = Self(600);
    pub const ENTRY_POINT_NOT_ASYNC: Self = Self(601);
    pub const ENTRY_POINT_HAS_PARAMS: Self = Self(602);
    pub const STRUCTURAL_LIMIT_EXCEEDED: Self = Self(607);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Structure,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Scope => write!(f, "scope"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// A structured front-end diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumaError {
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl LumaError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Build an error whose `source_line` is looked up in `source`.
    pub fn at(source: &SourceFile, code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        let line = source.line(span.line).unwrap_or("").to_string();
        Self::new(&source.name, code, message, span, line)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Downgrade to a warning.
    pub fn as_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    /// Caret-style rendering against the file the error was reported in.
    pub fn render(&self, source: &SourceFile) -> String {
        let mut out = source.render(&format!("error[{}]: {}", self.code, self.message), self.span);
        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!("\n  = help: {suggestion}"));
        }
        out
    }
}

impl fmt::Display for LumaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}] {}", self.span, self.code, self.category, self.message)
    }
}

impl std::error::Error for LumaError {}

/// Errors and warnings collected by one front-end run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<LumaError>,
    pub warnings: Vec<LumaError>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl CompileErrors {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A collection holding exactly one error.
    pub fn single(error: LumaError) -> Self {
        let mut errs = Self::empty();
        errs.push_error(error);
        errs
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// True once [`MAX_ERRORS`] errors have been seen.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Add an error; only the first [`MAX_ERRORS`] are stored, all are counted.
    pub fn push_error(&mut self, error: LumaError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    pub fn push_warning(&mut self, warning: LumaError) {
        self.warnings.push(warning);
        self.total_warnings += 1;
    }

    /// Fold another collection into this one.
    pub fn extend(&mut self, other: CompileErrors) {
        // Errors the other side counted but did not store.
        let dropped = other.total_errors.saturating_sub(other.errors.len());
        for e in other.errors {
            self.push_error(e);
        }
        self.total_errors += dropped;
        for w in other.warnings {
            self.push_warning(w);
        }
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) if self.total_errors > 1 => {
                write!(f, "{first} (and {} more)", self.total_errors - 1)
            }
            Some(first) => write!(f, "{first}"),
            None => write!(f, "no errors"),
        }
    }
}

impl std::error::Error for CompileErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: ErrorCode, line: u32) -> LumaError {
        LumaError::new("sketch.ino", code, "boom", Span::point(0, line, 1), "")
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::AWAIT_OUTSIDE_ASYNC.category(), ErrorCategory::Scope);
        assert_eq!(ErrorCode::MISSING_ENTRY_POINT.category(), ErrorCategory::Structure);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::AWAIT_OUTSIDE_ASYNC.to_string(), "E500");
    }

    #[test]
    fn test_compile_errors_cap() {
        let mut errs = CompileErrors::empty();
        for i in 0..25 {
            errs.push_error(sample(ErrorCode::UNEXPECTED_TOKEN, i + 1));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.is_full());
    }

    #[test]
    fn test_extend_keeps_counts() {
        let mut a = CompileErrors::single(sample(ErrorCode::UNEXPECTED_TOKEN, 1));
        let mut b = CompileErrors::empty();
        b.push_error(sample(ErrorCode::MISSING_ENTRY_POINT, 2));
        b.push_error(sample(ErrorCode::MISSING_ENTRY_POINT, 3));
        a.extend(b);
        assert_eq!(a.total_errors, 3);
        assert_eq!(a.errors.len(), 3);
    }

    #[test]
    fn test_display_mentions_remaining() {
        let mut errs = CompileErrors::single(sample(ErrorCode::UNEXPECTED_TOKEN, 4));
        errs.push_error(sample(ErrorCode::UNEXPECTED_TOKEN, 5));
        let text = errs.to_string();
        assert!(text.starts_with("4:1: E100 [syntax] boom"), "{text}");
        assert!(text.ends_with("(and 1 more)"));
    }

    #[test]
    fn test_error_json_shape() {
        let err = sample(ErrorCode::ENTRY_POINT_NOT_ASYNC, 2).with_suggestion("mark it async");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"category\":\"structure\""));
        assert!(json.contains("\"column\":1"));
        assert!(json.contains("\"suggestion\":\"mark it async\""));
    }
}
