//! Diagnostics
//!
//! Collects warnings and errors during flattening and synthesis.
//! Warnings record the lenient paths (dropped empty unions, ignored
//! `knownValues`); errors make `generate` refuse to produce output.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Flattening ===
    /// Union with an empty `refs` list, dropped from the table
    EmptyUnionDropped,
    /// `required` names a property that does not exist
    RequiredPropertyMissing,

    // === Closed Vocabularies ===
    /// String carries both `enum` and `knownValues`; `enum` wins
    EnumAndKnownValues,
    /// Two enum cases, union variants or struct fields share one identifier
    CaseNameConflict,

    // === Unions ===
    /// Same ref listed twice in one union
    DuplicateUnionRef,

    // === RPC ===
    /// Same error name declared twice on one method
    DuplicateErrorName,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyUnionDropped => "W001",
            Self::RequiredPropertyMissing => "W002",
            Self::EnumAndKnownValues => "W003",
            Self::DuplicateUnionRef => "W004",
            Self::DuplicateErrorName => "W005",
            Self::CaseNameConflict => "E001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::CaseNameConflict => Severity::Error,

            Self::EmptyUnionDropped
            | Self::RequiredPropertyMissing
            | Self::EnumAndKnownValues
            | Self::DuplicateUnionRef
            | Self::DuplicateErrorName => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Fully-qualified def key that caused this diagnostic
    pub def_key: String,
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (e.g. conflicting values, field paths)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(def_key: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            def_key: def_key.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.def_key
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Add a diagnostic; severity comes from the code
    pub fn report(&mut self, def_key: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) {
        self.push(DiagnosticItem::new(def_key, code, message));
    }

    pub fn empty_union(&mut self, def_key: impl Into<String>) {
        self.report(
            def_key,
            DiagnosticCode::EmptyUnionDropped,
            "Union has no refs and was dropped",
        );
    }

    /// Two distinct inputs map onto one identifier inside a single declaration
    pub fn case_name_conflict(&mut self, def_key: impl Into<String>, name: &str, originals: &[&str]) {
        self.push(
            DiagnosticItem::new(
                def_key,
                DiagnosticCode::CaseNameConflict,
                format!("Identifier '{}' is produced by more than one input", name),
            )
            .with_context(format!("Original values: {:?}", originals)),
        );
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Merge another Diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Sort by def key then code so parallel passes report deterministically
    pub fn sort(&mut self) {
        self.items
            .sort_by(|a, b| a.def_key.cmp(&b.def_key).then(a.code.as_str().cmp(b.code.as_str())));
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
