//
// finders/accessor.rs
//
// Cascades between properties and their accessor methods
//

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::finder::{ReferenceFinder, ReferenceSink};
use crate::solution::{Document, DocumentId, Project, ProjectId, Solution};
use crate::symbol::{Symbol, SymbolAndProject, SymbolKind};

const ACCESSOR_PREFIXES: [&str; 2] = ["get_", "set_"];

/// Links a property `P` to its `get_P` / `set_P` accessor methods and back.
///
/// Contributes only to the closure; it never nominates anything to search,
/// so the accessors are searched by whichever finders claim them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyAccessorFinder;

impl PropertyAccessorFinder {
    pub fn new() -> Self {
        Self
    }
}

fn with_name(symbol: &Symbol, name: &str, kind: SymbolKind) -> Symbol {
    Symbol {
        name: name.into(),
        kind,
        container: symbol.container.clone(),
    }
}

#[async_trait]
impl ReferenceFinder for PropertyAccessorFinder {
    fn name(&self) -> &'static str {
        "property-accessor"
    }

    async fn determine_cascaded_symbols(
        &self,
        symbol: &SymbolAndProject,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<SymbolAndProject>> {
        let declared = &symbol.symbol;
        let cascaded = match declared.kind {
            SymbolKind::Property => ACCESSOR_PREFIXES
                .iter()
                .map(|prefix| {
                    let accessor = format!("{}{}", prefix, declared.name);
                    with_name(declared, &accessor, SymbolKind::Method)
                })
                .collect(),
            SymbolKind::Method => ACCESSOR_PREFIXES
                .iter()
                .filter_map(|prefix| declared.name.strip_prefix(prefix))
                .filter(|property| !property.is_empty())
                .map(|property| with_name(declared, property, SymbolKind::Property))
                .collect(),
            _ => Vec::new(),
        };

        Ok(cascaded
            .into_iter()
            .map(|s| SymbolAndProject::new(s, symbol.project))
            .collect())
    }

    async fn determine_projects_to_search(
        &self,
        _symbol: &SymbolAndProject,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<ProjectId>> {
        Ok(Vec::new())
    }

    async fn determine_documents_to_search(
        &self,
        _symbol: &SymbolAndProject,
        _project: &Project,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<DocumentId>> {
        Ok(Vec::new())
    }

    async fn find_references_in_document(
        &self,
        _symbol: &SymbolAndProject,
        _document: &Document,
        _solution: &Solution,
        _sink: &dyn ReferenceSink,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn cascade(symbol: Symbol) -> Vec<SymbolAndProject> {
        PropertyAccessorFinder::new()
            .determine_cascaded_symbols(
                &SymbolAndProject::new(symbol, ProjectId(3)),
                &Solution::builder().build(),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_property_cascades_to_accessors() {
        let cascaded = cascade(Symbol::new("Name", SymbolKind::Property).with_container("Person")).await;
        let expected: Vec<_> = ["get_Name", "set_Name"]
            .iter()
            .map(|name| {
                SymbolAndProject::new(
                    Symbol::new(name, SymbolKind::Method).with_container("Person"),
                    ProjectId(3),
                )
            })
            .collect();
        assert_eq!(cascaded, expected);
    }

    #[tokio::test]
    async fn test_accessor_cascades_back_to_property() {
        let cascaded = cascade(Symbol::new("set_Name", SymbolKind::Method)).await;
        assert_eq!(
            cascaded,
            vec![SymbolAndProject::new(
                Symbol::new("Name", SymbolKind::Property),
                ProjectId(3)
            )]
        );
    }

    #[tokio::test]
    async fn test_unrelated_symbols_do_not_cascade() {
        assert!(cascade(Symbol::new("Run", SymbolKind::Method)).await.is_empty());
        assert!(cascade(Symbol::new("get_", SymbolKind::Method)).await.is_empty());
        assert!(cascade(Symbol::new("Name", SymbolKind::Field)).await.is_empty());
    }

    #[tokio::test]
    async fn test_nominates_nothing() {
        let mut builder = Solution::builder();
        let project = builder.add_project("core");
        let solution = builder.build();
        let symbol = SymbolAndProject::new(Symbol::new("Name", SymbolKind::Property), project);
        let projects = PropertyAccessorFinder::new()
            .determine_projects_to_search(&symbol, &solution, &CancellationToken::new())
            .await
            .unwrap();
        assert!(projects.is_empty());
    }
}
