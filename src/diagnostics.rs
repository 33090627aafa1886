//! Diagnostic reporting infrastructure
//!
//! Recoverable problems become `Diagnostic` values pushed to a sink owned
//! by the program; compilation continues past them, planting `unreachable`
//! nodes where lowering could not proceed. Consumers treat the presence of
//! any error diagnostic as compilation failure.

use std::cell::RefCell;
use thiserror::Error;

/// Every condition the code generator can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosticCode {
    #[error("imported file not found: '{0}'")]
    FileNotFound(String),
    #[error("function '{0}' has no body")]
    MissingFunctionBody(String),
    #[error("'this' is only valid inside an instance method")]
    ThisOutsideInstanceMethod,
    #[error("'break' used outside of an enclosing loop or switch")]
    BreakOutsideContext,
    #[error("'continue' used outside of an enclosing loop")]
    ContinueOutsideContext,
    #[error("duplicate local name '{0}'")]
    DuplicateLocal(String),
    #[error("type annotation required for '{0}'")]
    TypeAnnotationRequired(String),
    #[error("operation is not valid for type '{0}'")]
    InvalidOperation(String),
    #[error("expected {expected} call arguments but found {found}")]
    TooManyArguments { expected: usize, found: usize },
    #[error("missing argument for parameter '{0}'")]
    MissingArgument(String),
    #[error("expected {expected} type arguments but found {found}")]
    TypeArgumentMismatch { expected: usize, found: usize },
    #[error("expression is not assignable")]
    NotAssignable,
    #[error("cannot resolve '{0}'")]
    CannotResolve(String),
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("unsafe operation: {0}")]
    UnsafeOperation(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
}

/// Append-only diagnostic sink.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn error(&self, code: DiagnosticCode) {
        self.entries.borrow_mut().push(Diagnostic {
            severity: Severity::Error,
            code,
        });
    }

    pub fn warning(&self, code: DiagnosticCode) {
        self.entries.borrow_mut().push(Diagnostic {
            severity: Severity::Warning,
            code,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Whether some recorded diagnostic matches `predicate`.
    pub fn contains(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.entries.borrow().iter().any(|d| predicate(d))
    }
}
