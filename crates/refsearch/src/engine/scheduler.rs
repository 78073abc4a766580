//
// engine/scheduler.rs
//
// Runs document searches grouped by dependency set
//

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::aggregator::ReferenceAggregator;
use super::scope::DocumentWorkMap;
use super::SearchContext;
use crate::error::{check_cancelled, SearchError, SearchResult};
use crate::finder::{ReferenceSink, WorkItem};
use crate::location::ReferenceLocation;
use crate::perf::TimingGuard;
use crate::solution::{Document, DocumentId, ProjectId, Solution};
use crate::symbol::SymbolAndProject;

/// Work items per document, per owning project
type ProjectDocumentMap = IndexMap<ProjectId, IndexMap<DocumentId, Vec<WorkItem>>>;

/// Search every document in `document_map`.
///
/// Projects are processed one dependency set at a time. Within a set all
/// documents are searched concurrently; the set's work lists are dropped
/// before the next set starts. Each project counts as one progress item.
pub(crate) async fn process_documents(
    ctx: &Arc<SearchContext>,
    document_map: DocumentWorkMap,
) -> SearchResult<()> {
    if document_map.is_empty() {
        return Ok(());
    }

    let mut project_map = group_by_project(&ctx.solution, document_map)?;
    ctx.progress.add_items(project_map.len()).await;

    for set in ctx.solution.dependency_graph().dependency_sets() {
        check_cancelled(&ctx.cancel)?;
        let batch: Vec<_> = set
            .iter()
            .filter_map(|project| {
                project_map
                    .shift_remove(project)
                    .map(|documents| (*project, documents))
            })
            .collect();
        if batch.is_empty() {
            continue;
        }
        process_dependency_set(ctx, batch).await?;
    }

    if !project_map.is_empty() {
        log::warn!(
            "{} candidate project(s) missing from the dependency graph, searching them last",
            project_map.len()
        );
        let leftovers: Vec<_> = project_map.drain(..).collect();
        process_dependency_set(ctx, leftovers).await?;
    }
    Ok(())
}

/// Fold each document's work list into its owning project's bucket
fn group_by_project(
    solution: &Solution,
    document_map: DocumentWorkMap,
) -> SearchResult<ProjectDocumentMap> {
    let mut project_map = ProjectDocumentMap::new();
    for (document, items) in document_map {
        let project = solution
            .document(document)
            .ok_or(SearchError::UnknownDocument(document))?
            .project;
        project_map
            .entry(project)
            .or_default()
            .insert(document, items);
    }
    Ok(project_map)
}

async fn process_dependency_set(
    ctx: &Arc<SearchContext>,
    projects: Vec<(ProjectId, IndexMap<DocumentId, Vec<WorkItem>>)>,
) -> SearchResult<()> {
    let _timing = TimingGuard::new("find_references:dependency_set");
    log::debug!(
        "Searching dependency set of {} project(s), {} document(s)",
        projects.len(),
        projects.iter().map(|(_, docs)| docs.len()).sum::<usize>()
    );

    let mut tasks = JoinSet::new();
    for (project, documents) in projects {
        let remaining = Arc::new(AtomicUsize::new(documents.len()));
        for (document, items) in documents {
            let ctx = ctx.clone();
            let remaining = remaining.clone();
            tasks.spawn(async move {
                process_document(&ctx, document, items).await?;
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    log::trace!("Finished searching {}", project);
                    ctx.progress.item_completed().await;
                }
                Ok::<(), SearchError>(())
            });
        }
    }

    join_all(&mut tasks, &ctx.cancel).await
}

/// Wait for every task. On the first failure or on cancellation, abort the
/// rest and wait for them to wind down before returning.
async fn join_all(
    tasks: &mut JoinSet<SearchResult<()>>,
    cancel: &CancellationToken,
) -> SearchResult<()> {
    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(SearchError::Cancelled),
            next = tasks.join_next() => next,
        };
        match next {
            None => break Ok(()),
            Some(Ok(Ok(()))) => {}
            Some(Ok(Err(e))) => break Err(e),
            Some(Err(join_error)) if join_error.is_panic() => {
                break Err(SearchError::from_panic(join_error.into_panic()))
            }
            Some(Err(join_error)) => break Err(SearchError::TaskFailed(join_error.to_string())),
        }
    };

    if outcome.is_err() {
        tasks.shutdown().await;
    }
    outcome
}

async fn process_document(
    ctx: &SearchContext,
    document_id: DocumentId,
    items: Vec<WorkItem>,
) -> SearchResult<()> {
    check_cancelled(&ctx.cancel)?;
    let document = ctx
        .solution
        .document(document_id)
        .cloned()
        .ok_or(SearchError::UnknownDocument(document_id))?;

    ctx.progress.on_find_in_document_started(document_id).await;
    let result = search_document(ctx, &document, items).await;
    ctx.progress.on_find_in_document_completed(document_id).await;
    result
}

async fn search_document(
    ctx: &SearchContext,
    document: &Document,
    items: Vec<WorkItem>,
) -> SearchResult<()> {
    for item in items {
        check_cancelled(&ctx.cancel)?;
        log::trace!(
            "Searching {} for {} with {:?}",
            document.path.display(),
            item.symbol,
            item.finder
        );
        let sink = SymbolReferenceSink {
            symbol: &item.symbol,
            aggregator: &ctx.aggregator,
            cancel: &ctx.cancel,
        };
        item.finder
            .find_references_in_document(&item.symbol, document, &ctx.solution, &sink, &ctx.cancel)
            .await
            .map_err(|e| SearchError::from_finder(item.finder.name(), e, &ctx.cancel))?;
    }
    Ok(())
}

/// Forwards a finder's locations for one symbol to the aggregator
struct SymbolReferenceSink<'a> {
    symbol: &'a SymbolAndProject,
    aggregator: &'a ReferenceAggregator,
    cancel: &'a CancellationToken,
}

#[async_trait]
impl ReferenceSink for SymbolReferenceSink<'_> {
    async fn on_reference_found(&self, location: ReferenceLocation) -> SearchResult<()> {
        check_cancelled(self.cancel)?;
        self.aggregator.record(self.symbol, location).await;
        Ok(())
    }
}
