use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors stored per compile attempt.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Resolution,
    Type,
    Structure,
}

/// Numeric error code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNEXPECTED_EOF: Self = Self(101);
    pub const INVALID_CHARACTER: Self = Self(102);
    pub const INVALID_LITERAL: Self = Self(103);
    pub const UNSUPPORTED_FEATURE: Self = Self(104);
    pub const NESTING_LIMIT: Self = Self(105);

    // ── Resolution errors (E200–E299) ──
    pub const UNKNOWN_NAME: Self = Self(200);
    pub const UNKNOWN_TYPE: Self = Self(201);
    pub const UNKNOWN_MEMBER: Self = Self(202);
    pub const DUPLICATE_DECLARATION: Self = Self(203);
    pub const UNKNOWN_NAMESPACE: Self = Self(204);

    // ── Type errors (E300–E399) ──
    pub const TYPE_MISMATCH: Self = Self(300);
    pub const WRONG_ARG_COUNT: Self = Self(301);
    pub const INVALID_OPERATOR: Self = Self(302);
    pub const NOT_ASSIGNABLE: Self = Self(303);
    pub const NOT_CALLABLE: Self = Self(304);
    pub const CANNOT_INFER: Self = Self(305);

    // ── Structure errors (E400–E499) ──
    pub const MISPLACED_JUMP: Self = Self(400);
    pub const MISPLACED_RETURN: Self = Self(401);
    pub const STATIC_CONTEXT: Self = Self(402);
    pub const CANNOT_INSTANTIATE: Self = Self(403);
    pub const MISSING_RETURN: Self = Self(404);
    pub const INTERFACE_NOT_IMPLEMENTED: Self = Self(405);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Resolution,
            300..=399 => ErrorCategory::Type,
            400..=499 => ErrorCategory::Structure,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured Cinder diagnostic.
///
/// Front ends render these; they must not parse free-form strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CinderError {
    /// Source file name (`{interactive}` for REPL chunks).
    pub file: String,
    /// Error code (e.g., E300).
    pub code: ErrorCode,
    /// Diagnostic severity.
    pub severity: Severity,
    /// Diagnostic category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CinderError {
    /// Create a new error.
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

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Returns `true` if this diagnostic means the input simply stopped too early.
    pub fn is_unexpected_eof(&self) -> bool {
        self.code == ErrorCode::UNEXPECTED_EOF
    }

    /// Render in the compiler-style one-line form used by diagnostic sinks:
    /// `{interactive}(1,5): error E300: message`.
    pub fn render(&self) -> String {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        format!(
            "{}({},{}): {} {}: {}",
            self.file, self.span.start_line, self.span.start_col, severity, self.code, self.message
        )
    }
}

impl fmt::Display for CinderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for CinderError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Resolution => write!(f, "resolution"),
            Self::Type => write!(f, "type"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// Diagnostics collected during one compile attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CinderError>,
    pub warnings: Vec<CinderError>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl CompileErrors {
    /// Create an empty result (no errors).
    pub fn empty() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            total_errors: 0,
            total_warnings: 0,
        }
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: CinderError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Add a warning.
    pub fn push_warning(&mut self, warning: CinderError) {
        self.warnings.push(warning);
        self.total_warnings += 1;
    }

    /// Append every diagnostic from `other`, keeping their order.
    pub fn extend(&mut self, other: CompileErrors) {
        // Errors dropped by `other`'s cap still count.
        let dropped = other.total_errors.saturating_sub(other.errors.len());
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += dropped;
        for warning in other.warnings {
            self.push_warning(warning);
        }
    }

    /// The first recorded error, if any.
    pub fn first(&self) -> Option<&CinderError> {
        self.errors.first()
    }

    /// Returns `true` if the first error reports an unexpected end of input.
    ///
    /// Later errors are usually fallout from recovery, so only the first
    /// one decides whether the chunk was merely incomplete.
    pub fn is_partial_input(&self) -> bool {
        self.first().is_some_and(CinderError::is_unexpected_eof)
    }

    /// Returns `true` if any stored error carries `code`.
    pub fn contains(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error.render())?;
        }
        Ok(())
    }
}
