//
// progress.rs
//
// Progress notifications for streaming find-references requests
//

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{SearchError, SearchResult};
use crate::location::ReferenceLocation;
use crate::solution::DocumentId;
use crate::symbol::SymbolAndProject;

/// External sink for progress and per-location events.
///
/// Called from arbitrary worker tasks, possibly concurrently. Implementations
/// must not block the engine indefinitely.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_started(&self);

    async fn on_completed(&self);

    /// Fractional progress as `completed` out of `total` work items
    async fn report_progress(&self, completed: usize, total: usize);

    /// A symbol in the search closure, reported before any of its references
    async fn on_definition_found(&self, _symbol: &SymbolAndProject) {}

    /// A location not previously reported for its document
    async fn on_reference_found(&self, symbol: &SymbolAndProject, location: &ReferenceLocation);

    async fn on_find_in_document_started(&self, _document: DocumentId) {}

    async fn on_find_in_document_completed(&self, _document: DocumentId) {}
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

#[async_trait]
impl ProgressSink for NullProgress {
    async fn on_started(&self) {}
    async fn on_completed(&self) {}
    async fn report_progress(&self, _completed: usize, _total: usize) {}
    async fn on_reference_found(&self, _symbol: &SymbolAndProject, _location: &ReferenceLocation) {}
}

/// Sink that writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgress;

#[async_trait]
impl ProgressSink for LoggingProgress {
    async fn on_started(&self) {
        log::info!("Find references started");
    }

    async fn on_completed(&self) {
        log::info!("Find references completed");
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        log::debug!("Find references progress: {}/{}", completed, total);
    }

    async fn on_definition_found(&self, symbol: &SymbolAndProject) {
        log::debug!("Searching for references to {}", symbol);
    }

    async fn on_reference_found(&self, symbol: &SymbolAndProject, location: &ReferenceLocation) {
        log::trace!(
            "Reference to {} in {} at {}..{}",
            symbol,
            location.document,
            location.span.start,
            location.span.end
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ItemCounts {
    completed: usize,
    total: usize,
}

/// Engine-side wrapper around a [`ProgressSink`].
///
/// Tracks a monotonic work-item counter and reports `completed/total` after
/// every change. Updates are serialized so the sink observes a non-decreasing
/// completed count. Once cancellation is observed, progress reports stop.
///
/// The token should be owned by the request: dropping an unfinished
/// [`run`](Self::run) cancels it.
pub struct ProgressTracker {
    sink: Arc<dyn ProgressSink>,
    counts: Mutex<ItemCounts>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker").finish_non_exhaustive()
    }
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>, cancel: CancellationToken) -> Self {
        Self {
            sink,
            counts: Mutex::new(ItemCounts::default()),
            cancel,
        }
    }

    /// Run `work` inside the started/completed bracket.
    ///
    /// The request counts as one work item, added before `work` starts and
    /// completed after it finishes. A panic inside `work` is caught and
    /// returned as [`SearchError::TaskFailed`]. If the returned future is
    /// dropped before the bracket closes, the tracker's token is cancelled and
    /// `on_completed` is delivered from a task spawned on the current runtime.
    pub async fn run<F, T>(self: &Arc<Self>, work: F) -> SearchResult<T>
    where
        F: Future<Output = SearchResult<T>>,
    {
        self.sink.on_started().await;
        let mut bracket = CompletionGuard {
            tracker: Some(self.clone()),
        };
        self.add_items(1).await;

        let output = AssertUnwindSafe(work)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(SearchError::from_panic(payload)));

        self.item_completed().await;
        bracket.tracker = None;
        self.sink.on_completed().await;
        output
    }

    pub async fn add_items(&self, count: usize) {
        let mut counts = self.counts.lock().await;
        counts.total += count;
        self.report(*counts).await;
    }

    pub async fn item_completed(&self) {
        let mut counts = self.counts.lock().await;
        counts.completed += 1;
        debug_assert!(
            counts.completed <= counts.total,
            "completed {} items of {}",
            counts.completed,
            counts.total
        );
        self.report(*counts).await;
    }

    /// Current (completed, total) item counts
    pub async fn counts(&self) -> (usize, usize) {
        let counts = self.counts.lock().await;
        (counts.completed, counts.total)
    }

    /// Close the bracket of a request whose future was dropped
    async fn complete_abandoned(&self) {
        {
            let mut counts = self.counts.lock().await;
            if counts.completed < counts.total {
                counts.completed += 1;
            }
        }
        self.sink.on_completed().await;
    }

    async fn report(&self, counts: ItemCounts) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.sink
            .report_progress(counts.completed, counts.total)
            .await;
    }

    pub async fn on_definition_found(&self, symbol: &SymbolAndProject) {
        self.sink.on_definition_found(symbol).await;
    }

    pub async fn on_reference_found(&self, symbol: &SymbolAndProject, location: &ReferenceLocation) {
        self.sink.on_reference_found(symbol, location).await;
    }

    pub async fn on_find_in_document_started(&self, document: DocumentId) {
        self.sink.on_find_in_document_started(document).await;
    }

    pub async fn on_find_in_document_completed(&self, document: DocumentId) {
        self.sink.on_find_in_document_completed(document).await;
    }
}

/// Closes the bracket from `Drop` when [`ProgressTracker::run`] does not get
/// to close it inline.
struct CompletionGuard {
    tracker: Option<Arc<ProgressTracker>>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let Some(tracker) = self.tracker.take() else {
            return;
        };
        tracker.cancel.cancel();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { tracker.complete_abandoned().await });
            }
            Err(_) => log::warn!("Find references dropped outside a runtime; on_completed not delivered"),
        }
    }
}
