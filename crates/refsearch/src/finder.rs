//
// finder.rs
//
// Capability interface for pluggable reference-search strategies
//

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SearchResult;
use crate::location::ReferenceLocation;
use crate::solution::{Document, DocumentId, Project, ProjectId, Solution};
use crate::symbol::SymbolAndProject;

/// Receives locations from a finder as they are discovered.
///
/// Returning an error (typically `SearchError::Cancelled`) tells the finder to
/// stop; finders propagate it with `?`.
#[async_trait]
pub trait ReferenceSink: Send + Sync {
    async fn on_reference_found(&self, location: ReferenceLocation) -> SearchResult<()>;
}

/// A reference-matching strategy for one category of symbol.
///
/// The engine is strategy-agnostic and dispatches purely through this trait.
/// Implementations hold no per-request state and may be called concurrently
/// for different documents and symbols. A strategy that does not apply to a
/// symbol returns empty results rather than an error. Any error is fatal to
/// the whole request.
#[async_trait]
pub trait ReferenceFinder: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Symbols that must be searched together with `symbol` (overrides,
    /// partial parts, interface implementations, accessors).
    async fn determine_cascaded_symbols(
        &self,
        _symbol: &SymbolAndProject,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<SymbolAndProject>> {
        Ok(Vec::new())
    }

    /// Projects that could possibly contain a reference to `symbol`
    async fn determine_projects_to_search(
        &self,
        symbol: &SymbolAndProject,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<ProjectId>>;

    /// Documents within `project` that could possibly contain a reference
    async fn determine_documents_to_search(
        &self,
        symbol: &SymbolAndProject,
        project: &Project,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<DocumentId>>;

    /// Search one document, forwarding each location to `sink` as it is found
    async fn find_references_in_document(
        &self,
        symbol: &SymbolAndProject,
        document: &Document,
        solution: &Solution,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}

/// A finder together with its position in the engine's finder set.
///
/// Equality and hashing use the position, so one strategy instance is one
/// identity for the lifetime of an engine.
#[derive(Clone)]
pub struct FinderHandle {
    index: usize,
    finder: Arc<dyn ReferenceFinder>,
}

impl FinderHandle {
    /// Assign stable identities to a set of finders
    pub fn enumerate(finders: Vec<Arc<dyn ReferenceFinder>>) -> Arc<[FinderHandle]> {
        finders
            .into_iter()
            .enumerate()
            .map(|(index, finder)| FinderHandle { index, finder })
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Deref for FinderHandle {
    type Target = dyn ReferenceFinder;

    fn deref(&self) -> &Self::Target {
        self.finder.as_ref()
    }
}

impl PartialEq for FinderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for FinderHandle {}

impl Hash for FinderHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Debug for FinderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.finder.name(), self.index)
    }
}

/// A (symbol, strategy) pair scheduled against one document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub symbol: SymbolAndProject,
    pub finder: FinderHandle,
}

impl WorkItem {
    pub fn new(symbol: SymbolAndProject, finder: FinderHandle) -> Self {
        Self { symbol, finder }
    }
}
