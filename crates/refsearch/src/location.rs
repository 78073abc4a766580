//
// location.rs
//
// Reference locations and finalized per-symbol results
//

use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::solution::DocumentId;
use crate::symbol::SymbolAndProject;

/// Half-open byte range `[start, end)` within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// How a reference uses the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceUsage {
    #[default]
    Read,
    Write,
    ReadWrite,
}

/// Where a reference occurs, plus context reported by the finder.
///
/// Two locations are equal when they name the same document, span and
/// implicitness. `usage` is contextual metadata and does not take part in
/// equality, so two finders that classify the same occurrence differently
/// still collapse to one location.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceLocation {
    pub document: DocumentId,
    pub span: TextSpan,
    /// The reference is implied by the code rather than written out
    pub is_implicit: bool,
    pub usage: ReferenceUsage,
}

impl ReferenceLocation {
    pub fn new(document: DocumentId, span: TextSpan) -> Self {
        Self {
            document,
            span,
            is_implicit: false,
            usage: ReferenceUsage::Read,
        }
    }

    pub fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }

    pub fn with_usage(mut self, usage: ReferenceUsage) -> Self {
        self.usage = usage;
        self
    }
}

impl PartialEq for ReferenceLocation {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
            && self.span == other.span
            && self.is_implicit == other.is_implicit
    }
}

impl Eq for ReferenceLocation {}

impl Hash for ReferenceLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.document.hash(state);
        self.span.hash(state);
        self.is_implicit.hash(state);
    }
}

/// Finalized result record: a symbol identity and its deduplicated locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencedSymbol {
    pub definition: SymbolAndProject,
    pub locations: Vec<ReferenceLocation>,
}
