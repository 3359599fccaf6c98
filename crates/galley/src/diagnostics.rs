//! Non-fatal warnings produced while packing and breaking.

use galley_core::Scaled;

/// Kind of box a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    HBox,
    VBox,
}

impl std::fmt::Display for BoxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxKind::HBox => write!(f, r"\hbox"),
            BoxKind::VBox => write!(f, r"\vbox"),
        }
    }
}

/// A warning attached to a line, a page, or an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The box content is wider (or taller) than the target even with all glue shrunk.
    Overfull { kind: BoxKind, excess: Scaled },
    /// The box glue shrinks with a badness above the threshold.
    Tight { kind: BoxKind, badness: i32 },
    /// The box glue stretches with a badness above the threshold but at most 100.
    Loose { kind: BoxKind, badness: i32 },
    /// The box glue stretches with a badness above 100.
    Underfull { kind: BoxKind, badness: i32 },
    /// No feasible break was found for this line, so the breaker forced one.
    InfeasibleLine { line: usize },
    /// No feasible break was found for this page, so the breaker forced one.
    InfeasiblePage { page: usize },
    /// An insertion did not fit on an empty page and was cut at the first possible point.
    InsertionOverflow { class: u8, excess: Scaled },
    /// A float is taller than an empty page.
    FloatOverflow { excess: Scaled },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Diagnostic::*;
        match self {
            Overfull { kind, excess } => write!(f, "Overfull {kind} ({excess} too wide)"),
            Tight { kind, badness } => write!(f, "Tight {kind} (badness {badness})"),
            Loose { kind, badness } => write!(f, "Loose {kind} (badness {badness})"),
            Underfull { kind, badness } => write!(f, "Underfull {kind} (badness {badness})"),
            InfeasibleLine { line } => write!(f, "no feasible break for line {line}"),
            InfeasiblePage { page } => write!(f, "no feasible break for page {page}"),
            InsertionOverflow { class, excess } => {
                write!(f, "insertion of class {class} overflows the page by {excess}")
            }
            FloatOverflow { excess } => write!(f, "float overflows the page by {excess}"),
        }
    }
}

/// Records a diagnostic and emits it through the log.
pub(crate) fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}
