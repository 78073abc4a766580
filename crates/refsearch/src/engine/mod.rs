//
// engine/mod.rs
//
// Find-references coordinator
//
// A request flows through four stages:
//   1. closure    - expand the initial symbol(s) through every finder's cascades
//   2. scope      - map each (symbol, finder) pair to candidate projects, then documents
//   3. scheduler  - search documents concurrently, one dependency set at a time
//   4. aggregator - deduplicate locations and notify the progress sink
//

mod aggregator;
mod closure;
mod scheduler;
mod scope;


use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use aggregator::ReferenceAggregator;

use crate::config::EngineConfig;
use crate::error::{check_cancelled, SearchResult};
use crate::finder::{FinderHandle, ReferenceFinder};
use crate::location::ReferencedSymbol;
use crate::perf::TimingGuard;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::solution::Solution;
use crate::symbol::SymbolAndProject;

/// Shared state for the document tasks of one request
pub(crate) struct SearchContext {
    pub(crate) solution: Arc<Solution>,
    pub(crate) aggregator: Arc<ReferenceAggregator>,
    pub(crate) progress: Arc<ProgressTracker>,
    pub(crate) cancel: CancellationToken,
}

/// Coordinates reference finders over a solution snapshot.
///
/// The engine is cheap to share between requests: each call to
/// [`find_references`](Self::find_references) gets its own aggregator and
/// progress tracker, so concurrent requests never see each other's results.
pub struct FindReferencesEngine {
    solution: Arc<Solution>,
    finders: Arc<[FinderHandle]>,
    progress: Arc<dyn ProgressSink>,
    config: EngineConfig,
}

impl std::fmt::Debug for FindReferencesEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindReferencesEngine")
            .field("projects", &self.solution.project_count())
            .field("documents", &self.solution.document_count())
            .field("finders", &self.finders)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FindReferencesEngine {
    pub fn new(
        solution: Arc<Solution>,
        finders: Vec<Arc<dyn ReferenceFinder>>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            solution,
            finders: FinderHandle::enumerate(finders),
            progress,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn solution(&self) -> &Arc<Solution> {
        &self.solution
    }

    /// Find every reference to `symbol` and to the symbols it cascades to.
    ///
    /// The progress sink sees `on_started` first and `on_completed` last on
    /// every outcome, including failure, cancellation, a panicking finder and
    /// the returned future being dropped. Locations stream to the sink as they
    /// are found; the returned list groups them by symbol.
    pub async fn find_references(
        &self,
        symbol: SymbolAndProject,
        cancel: CancellationToken,
    ) -> SearchResult<Vec<ReferencedSymbol>> {
        self.find_references_for_symbols(&[symbol], cancel).await
    }

    /// Like [`find_references`](Self::find_references), seeded with several
    /// symbols at once. The symbols share one closure, one progress bracket
    /// and one deduplicated result.
    pub async fn find_references_for_symbols(
        &self,
        symbols: &[SymbolAndProject],
        cancel: CancellationToken,
    ) -> SearchResult<Vec<ReferencedSymbol>> {
        let timing = TimingGuard::with_threshold("find_references", 1000);
        // Cancelled if the returned future is dropped; `cancel` itself is left alone.
        let request = cancel.child_token();
        let tracker = Arc::new(ProgressTracker::new(self.progress.clone(), request.clone()));

        let result = tracker
            .run(self.search(symbols, tracker.clone(), request))
            .await;
        let elapsed = timing.finish();

        match &result {
            Ok(symbols) => log::debug!(
                "Found {} reference(s) across {} symbol(s) in {:?}",
                symbols.iter().map(|s| s.locations.len()).sum::<usize>(),
                symbols.len(),
                elapsed
            ),
            Err(e) if e.is_cancelled() => log::debug!("Find references cancelled after {:?}", elapsed),
            Err(e) => log::warn!("Find references failed after {:?}: {}", elapsed, e),
        }
        result
    }

    async fn search(
        &self,
        symbols: &[SymbolAndProject],
        progress: Arc<ProgressTracker>,
        cancel: CancellationToken,
    ) -> SearchResult<Vec<ReferencedSymbol>> {
        check_cancelled(&cancel)?;
        let options = &self.config.options;

        let closure = closure::resolve_closure(
            symbols,
            &self.finders,
            &self.solution,
            options.cascade,
            &cancel,
        )
        .await?;

        if self.config.report_definitions {
            for symbol in &closure {
                progress.on_definition_found(symbol).await;
            }
        }

        let project_map = scope::determine_projects_to_search(
            &closure,
            &self.finders,
            &self.solution,
            options,
            &cancel,
        )
        .await?;
        let document_map =
            scope::determine_documents_to_search(project_map, &self.solution, options, &cancel)
                .await?;
        if document_map.is_empty() {
            log::debug!("No candidate documents for {} symbol(s)", closure.len());
            return Ok(Vec::new());
        }

        let aggregator = Arc::new(ReferenceAggregator::new(progress.clone()));
        let ctx = Arc::new(SearchContext {
            solution: self.solution.clone(),
            aggregator: aggregator.clone(),
            progress,
            cancel: cancel.clone(),
        });
        scheduler::process_documents(&ctx, document_map).await?;

        check_cancelled(&cancel)?;
        Ok(aggregator.to_referenced_symbols(&closure))
    }
}
