//
// engine/aggregator.rs
//
// Concurrent, deduplicating sink for discovered reference locations
//

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use indexmap::IndexSet;

use crate::location::{ReferenceLocation, ReferencedSymbol};
use crate::progress::ProgressTracker;
use crate::solution::DocumentId;
use crate::symbol::SymbolAndProject;

/// Running result of one search request.
///
/// Locations are grouped per symbol identity (the result) and per document
/// (for notification dedup). Both maps are insert-only and safe for any
/// number of concurrent writers; buckets are created on first use.
pub struct ReferenceAggregator {
    symbol_to_locations: DashMap<SymbolAndProject, DashSet<ReferenceLocation>>,
    document_to_locations: DashMap<DocumentId, DashSet<ReferenceLocation>>,
    progress: Arc<ProgressTracker>,
}

impl std::fmt::Debug for ReferenceAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceAggregator")
            .field("symbols", &self.symbol_to_locations.len())
            .field("documents", &self.document_to_locations.len())
            .finish_non_exhaustive()
    }
}

impl ReferenceAggregator {
    pub fn new(progress: Arc<ProgressTracker>) -> Self {
        Self {
            symbol_to_locations: DashMap::new(),
            document_to_locations: DashMap::new(),
            progress,
        }
    }

    /// Record `location` as a reference to `symbol`.
    ///
    /// Idempotent per symbol. The progress sink is notified only the first
    /// time a location is seen in its document, whichever symbol or finder
    /// reports it. Returns whether the sink was notified.
    pub async fn record(&self, symbol: &SymbolAndProject, location: ReferenceLocation) -> bool {
        match self.symbol_to_locations.get(symbol) {
            Some(locations) => {
                locations.insert(location.clone());
            }
            None => {
                self.symbol_to_locations
                    .entry(symbol.clone())
                    .or_default()
                    .insert(location.clone());
            }
        }

        let first_in_document = self
            .document_to_locations
            .entry(location.document)
            .or_default()
            .insert(location.clone());

        if first_in_document {
            self.progress.on_reference_found(symbol, &location).await;
        } else {
            log::trace!(
                "Suppressed duplicate notification for {} at {}..{}",
                location.document,
                location.span.start,
                location.span.end
            );
        }
        first_in_document
    }

    /// Number of distinct locations recorded for `symbol`
    pub fn location_count(&self, symbol: &SymbolAndProject) -> usize {
        self.symbol_to_locations
            .get(symbol)
            .map_or(0, |locations| locations.len())
    }

    /// Number of distinct locations recorded in `document` across all symbols
    pub fn document_location_count(&self, document: DocumentId) -> usize {
        self.document_to_locations
            .get(&document)
            .map_or(0, |locations| locations.len())
    }

    /// Read out the result, one record per symbol with at least one location.
    ///
    /// Records follow `order` (the closure order); symbols outside it come
    /// last. Locations are sorted by document and span for stable display.
    pub fn to_referenced_symbols(&self, order: &IndexSet<SymbolAndProject>) -> Vec<ReferencedSymbol> {
        let mut results: Vec<(usize, ReferencedSymbol)> = self
            .symbol_to_locations
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| {
                let mut locations: Vec<ReferenceLocation> =
                    entry.value().iter().map(|l| l.key().clone()).collect();
                locations.sort_by_key(|l| (l.document, l.span, l.is_implicit));
                let rank = order.get_index_of(entry.key()).unwrap_or(usize::MAX);
                (
                    rank,
                    ReferencedSymbol {
                        definition: entry.key().clone(),
                        locations,
                    },
                )
            })
            .collect();

        results.sort_by_key(|(rank, _)| *rank);
        results.into_iter().map(|(_, symbol)| symbol).collect()
    }
}
