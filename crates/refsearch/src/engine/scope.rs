//
// engine/scope.rs
//
// Narrows each (symbol, finder) pair to candidate projects and documents
//

use indexmap::{IndexMap, IndexSet};
use tokio_util::sync::CancellationToken;

use crate::config::SearchOptions;
use crate::error::{check_cancelled, SearchError, SearchResult};
use crate::finder::{FinderHandle, WorkItem};
use crate::perf::TimingGuard;
use crate::solution::{DocumentId, ProjectId, Solution};
use crate::symbol::SymbolAndProject;

/// Work items per candidate project
pub(crate) type ProjectWorkMap = IndexMap<ProjectId, Vec<WorkItem>>;

/// Work items per candidate document
pub(crate) type DocumentWorkMap = IndexMap<DocumentId, Vec<WorkItem>>;

/// Stage A: ask every finder which projects could reference each symbol.
pub(crate) async fn determine_projects_to_search(
    closure: &IndexSet<SymbolAndProject>,
    finders: &[FinderHandle],
    solution: &Solution,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> SearchResult<ProjectWorkMap> {
    let _timing = TimingGuard::new("find_references:projects");
    let mut project_map = ProjectWorkMap::new();

    for symbol in closure {
        for finder in finders {
            check_cancelled(cancel)?;
            let projects = finder
                .determine_projects_to_search(symbol, solution, cancel)
                .await
                .map_err(|e| SearchError::from_finder(finder.name(), e, cancel))?;

            for project in projects {
                if solution.project(project).is_none() {
                    return Err(SearchError::UnknownProject(project));
                }
                if !options.includes_project(project, solution) {
                    continue;
                }
                project_map
                    .entry(project)
                    .or_default()
                    .push(WorkItem::new(symbol.clone(), finder.clone()));
            }
        }
    }

    log::debug!("{} candidate project(s)", project_map.len());
    Ok(project_map)
}

/// Stage B: within each candidate project, ask the finder of every work item
/// which documents could reference its symbol.
pub(crate) async fn determine_documents_to_search(
    project_map: ProjectWorkMap,
    solution: &Solution,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> SearchResult<DocumentWorkMap> {
    let _timing = TimingGuard::new("find_references:documents");
    let mut document_map = DocumentWorkMap::new();

    for (project_id, items) in project_map {
        let project = solution
            .project(project_id)
            .ok_or(SearchError::UnknownProject(project_id))?;

        for item in items {
            check_cancelled(cancel)?;
            let documents = item
                .finder
                .determine_documents_to_search(&item.symbol, project, solution, cancel)
                .await
                .map_err(|e| SearchError::from_finder(item.finder.name(), e, cancel))?;

            for document in documents {
                let owner = solution
                    .document(document)
                    .ok_or(SearchError::UnknownDocument(document))?
                    .project;
                crate::debug_invariant!(
                    owner == project_id,
                    "{:?} nominated {} from {} while searching {}",
                    item.finder,
                    document,
                    owner,
                    project_id
                );
                if !options.includes_document(document) {
                    continue;
                }
                add_work_item(&mut document_map, document, item.clone())?;
            }
        }
    }

    log::debug!("{} candidate document(s)", document_map.len());
    Ok(document_map)
}

/// Schedule `item` against `document`.
///
/// A work item may appear against a document at most once; in debug builds a
/// duplicate is reported as an invariant violation.
pub(crate) fn add_work_item(
    document_map: &mut DocumentWorkMap,
    document: DocumentId,
    item: WorkItem,
) -> SearchResult<()> {
    let items = document_map.entry(document).or_default();
    crate::debug_invariant!(
        !items.contains(&item),
        "{:?} for {} scheduled twice against {}",
        item.finder,
        item.symbol,
        document
    );
    items.push(item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::finder::ReferenceFinder;
    use crate::symbol::{Symbol, SymbolKind};
    use crate::test_utils::scripted_finder::{FailAt, ScriptedFinder};

    struct Fixture {
        solution: Solution,
        a: ProjectId,
        b: ProjectId,
        a1: DocumentId,
        a2: DocumentId,
        b1: DocumentId,
    }

    fn fixture() -> Fixture {
        let mut builder = Solution::builder();
        let a = builder.add_project("A");
        let b = builder.add_project("B");
        let a1 = builder.add_document(a, "a1.cs", "").unwrap();
        let a2 = builder.add_document(a, "a2.cs", "").unwrap();
        let b1 = builder.add_document(b, "b1.cs", "").unwrap();
        Fixture {
            solution: builder.build(),
            a,
            b,
            a1,
            a2,
            b1,
        }
    }

    fn sym(name: &str, project: ProjectId) -> SymbolAndProject {
        SymbolAndProject::new(Symbol::new(name, SymbolKind::Property), project)
    }

    fn handles(finders: Vec<ScriptedFinder>) -> Arc<[FinderHandle]> {
        FinderHandle::enumerate(
            finders
                .into_iter()
                .map(|f| Arc::new(f) as Arc<dyn ReferenceFinder>)
                .collect(),
        )
    }

    async fn map(
        fx: &Fixture,
        closure: &[SymbolAndProject],
        finders: &[FinderHandle],
        options: &SearchOptions,
    ) -> SearchResult<DocumentWorkMap> {
        let closure: IndexSet<_> = closure.iter().cloned().collect();
        let cancel = CancellationToken::new();
        let projects =
            determine_projects_to_search(&closure, finders, &fx.solution, options, &cancel).await?;
        determine_documents_to_search(projects, &fx.solution, options, &cancel).await
    }

    #[tokio::test]
    async fn test_documents_collect_items_from_every_finder() {
        let fx = fixture();
        let x = sym("X", fx.a);
        let finders = handles(vec![
            ScriptedFinder::new("first").scope(&x, fx.a, &[fx.a1, fx.a2]),
            ScriptedFinder::new("second").scope(&x, fx.a, &[fx.a1]),
        ]);

        let documents = map(&fx, &[x.clone()], &finders, &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[&fx.a1].len(), 2);
        assert_eq!(documents[&fx.a2].len(), 1);
        assert_eq!(documents[&fx.a2][0].finder, finders[0]);
        assert!(!documents.contains_key(&fx.b1));
    }

    #[tokio::test]
    async fn test_no_candidates_yields_empty_map() {
        let fx = fixture();
        let finders = handles(vec![ScriptedFinder::new("idle")]);
        let documents = map(&fx, &[sym("X", fx.a)], &finders, &SearchOptions::default())
            .await
            .unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_document_scope_filters_projects_and_documents() {
        let fx = fixture();
        let x = sym("X", fx.a);
        let finders = handles(vec![ScriptedFinder::new("f")
            .scope(&x, fx.a, &[fx.a1, fx.a2])
            .scope(&x, fx.b, &[fx.b1])]);

        let options = SearchOptions::default().with_document_scope([fx.a2]);
        let documents = map(&fx, &[x], &finders, &options).await.unwrap();

        assert_eq!(documents.keys().copied().collect::<Vec<_>>(), vec![fx.a2]);
    }

    #[tokio::test]
    async fn test_unknown_project_is_fatal() {
        let fx = fixture();
        let x = sym("X", fx.a);
        let finders = handles(vec![ScriptedFinder::new("f").scope(&x, ProjectId(42), &[])]);
        let err = map(&fx, &[x], &finders, &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownProject(ProjectId(42))));
    }

    #[tokio::test]
    async fn test_unknown_document_is_fatal() {
        let fx = fixture();
        let x = sym("X", fx.a);
        let finders = handles(vec![ScriptedFinder::new("f").scope(&x, fx.a, &[DocumentId(99)])]);
        let err = map(&fx, &[x], &finders, &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownDocument(DocumentId(99))));
    }

    #[tokio::test]
    async fn test_finder_failure_while_narrowing_documents() {
        let fx = fixture();
        let x = sym("X", fx.a);
        let finders = handles(vec![ScriptedFinder::new("f")
            .scope(&x, fx.a, &[fx.a1])
            .fail_at(FailAt::Documents)]);
        let err = map(&fx, &[x], &finders, &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Finder { finder: "f", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_project_nomination_violates_invariant() {
        let fx = fixture();
        let x = sym("X", fx.a);
        let finders = handles(vec![ScriptedFinder::new("f")
            .scope(&x, fx.a, &[fx.a1])
            .raw_project(&x, fx.a)]);
        let result = map(&fx, &[x], &finders, &SearchOptions::default()).await;

        if cfg!(debug_assertions) {
            assert!(matches!(result, Err(SearchError::Invariant(_))));
        } else {
            // Unchecked in release builds: the item is scheduled twice
            assert_eq!(result.unwrap()[&fx.a1].len(), 2);
        }
    }

    #[test]
    fn test_add_work_item_rejects_duplicates_in_debug() {
        let fx = fixture();
        let finders = handles(vec![ScriptedFinder::new("f")]);
        let item = WorkItem::new(sym("X", fx.a), finders[0].clone());
        let mut documents = DocumentWorkMap::new();

        add_work_item(&mut documents, fx.a1, item.clone()).unwrap();
        add_work_item(&mut documents, fx.a2, item.clone()).unwrap();
        let second = add_work_item(&mut documents, fx.a1, item);

        if cfg!(debug_assertions) {
            assert!(matches!(second, Err(SearchError::Invariant(_))));
            assert_eq!(documents[&fx.a1].len(), 1);
        } else {
            assert!(second.is_ok());
        }
    }
}
