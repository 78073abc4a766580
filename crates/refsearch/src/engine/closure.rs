//
// engine/closure.rs
//
// Expands initial symbols into the set of symbols searched together
//

use std::collections::VecDeque;

use indexmap::IndexSet;
use tokio_util::sync::CancellationToken;

use crate::error::{check_cancelled, SearchError, SearchResult};
use crate::finder::FinderHandle;
use crate::perf::TimingGuard;
use crate::solution::Solution;
use crate::symbol::SymbolAndProject;

/// Compute the cascade closure of `initial`.
///
/// Each finder is asked for the symbols cascaded from every member of the
/// closure until a fixed point is reached. The result keeps discovery order
/// with the initial symbols first. Any finder error fails the whole
/// expansion; no partial closure is returned.
pub(crate) async fn resolve_closure(
    initial: &[SymbolAndProject],
    finders: &[FinderHandle],
    solution: &Solution,
    cascade: bool,
    cancel: &CancellationToken,
) -> SearchResult<IndexSet<SymbolAndProject>> {
    let _timing = TimingGuard::new("find_references:closure");

    let mut closure: IndexSet<SymbolAndProject> = initial.iter().cloned().collect();
    if !cascade {
        check_cancelled(cancel)?;
        return Ok(closure);
    }

    let mut pending: VecDeque<SymbolAndProject> = closure.iter().cloned().collect();
    while let Some(symbol) = pending.pop_front() {
        for finder in finders {
            check_cancelled(cancel)?;
            let cascaded = finder
                .determine_cascaded_symbols(&symbol, solution, cancel)
                .await
                .map_err(|e| SearchError::from_finder(finder.name(), e, cancel))?;

            for next in cascaded {
                if closure.insert(next.clone()) {
                    log::trace!("{} cascades {} to {}", finder.name(), symbol, next);
                    pending.push_back(next);
                }
            }
        }
    }

    log::debug!(
        "Resolved closure of {} initial symbol(s) to {} symbol(s)",
        initial.len(),
        closure.len()
    );
    Ok(closure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::finder::ReferenceFinder;
    use crate::solution::ProjectId;
    use crate::symbol::{Symbol, SymbolKind};
    use crate::test_utils::scripted_finder::{FailAt, ScriptedFinder};

    fn sym(name: &str, project: u32) -> SymbolAndProject {
        SymbolAndProject::new(Symbol::new(name, SymbolKind::Method), ProjectId(project))
    }

    fn handles(finders: Vec<ScriptedFinder>) -> Arc<[FinderHandle]> {
        FinderHandle::enumerate(
            finders
                .into_iter()
                .map(|f| Arc::new(f) as Arc<dyn ReferenceFinder>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_no_cascades_yields_initial_symbol() {
        let solution = Solution::builder().build();
        let finders = handles(vec![ScriptedFinder::new("a")]);
        let closure = resolve_closure(
            &[sym("X", 0)],
            &finders,
            &solution,
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec![sym("X", 0)]);
    }

    #[tokio::test]
    async fn test_fixed_point_across_finders() {
        // a: X -> Y, b: Y -> Z, a: Z -> X (cycle back)
        let solution = Solution::builder().build();
        let finders = handles(vec![
            ScriptedFinder::new("a")
                .cascade(&sym("X", 0), &sym("Y", 0))
                .cascade(&sym("Z", 1), &sym("X", 0)),
            ScriptedFinder::new("b").cascade(&sym("Y", 0), &sym("Z", 1)),
        ]);
        let closure = resolve_closure(
            &[sym("X", 0)],
            &finders,
            &solution,
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            closure.into_iter().collect::<Vec<_>>(),
            vec![sym("X", 0), sym("Y", 0), sym("Z", 1)]
        );
    }

    #[tokio::test]
    async fn test_cascade_disabled() {
        let solution = Solution::builder().build();
        let finders = handles(vec![ScriptedFinder::new("a").cascade(&sym("X", 0), &sym("Y", 0))]);
        let closure = resolve_closure(
            &[sym("X", 0)],
            &finders,
            &solution,
            false,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(closure.len(), 1);
    }

    #[tokio::test]
    async fn test_multiple_initial_symbols_are_deduplicated() {
        let solution = Solution::builder().build();
        let finders = handles(vec![ScriptedFinder::new("a").cascade(&sym("X", 0), &sym("Y", 0))]);
        let closure = resolve_closure(
            &[sym("X", 0), sym("Y", 0), sym("X", 0)],
            &finders,
            &solution,
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            closure.into_iter().collect::<Vec<_>>(),
            vec![sym("X", 0), sym("Y", 0)]
        );
    }

    #[tokio::test]
    async fn test_finder_error_is_fatal() {
        let solution = Solution::builder().build();
        let finders = handles(vec![ScriptedFinder::new("broken").fail_at(FailAt::Cascade)]);
        let err = resolve_closure(
            &[sym("X", 0)],
            &finders,
            &solution,
            true,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SearchError::Finder { finder: "broken", .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_expansion() {
        let solution = Solution::builder().build();
        let finders = handles(vec![ScriptedFinder::new("a")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = resolve_closure(&[sym("X", 0)], &finders, &solution, true, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
