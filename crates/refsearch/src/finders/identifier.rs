//
// finders/identifier.rs
//
// Whole-identifier text matching across the projects that can see a symbol
//

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::finder::{ReferenceFinder, ReferenceSink};
use crate::location::{ReferenceLocation, ReferenceUsage, TextSpan};
use crate::solution::{Document, DocumentId, Project, ProjectId, Solution};
use crate::symbol::SymbolAndProject;

/// Finds references by matching the symbol's name as a whole identifier.
///
/// Visibility follows project references: a symbol declared in project P can
/// only be referenced from P and the projects that (transitively) depend on
/// it. Documents are pre-filtered with a substring check before the regex
/// runs.
#[derive(Debug, Default)]
pub struct IdentifierReferenceFinder {
    patterns: DashMap<Arc<str>, Regex>,
}

impl IdentifierReferenceFinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn pattern(&self, name: &Arc<str>) -> anyhow::Result<Regex> {
        if let Some(regex) = self.patterns.get(name) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(&format!(r"\b{}\b", regex::escape(name)))?;
        self.patterns.insert(name.clone(), regex.clone());
        Ok(regex)
    }
}

#[async_trait]
impl ReferenceFinder for IdentifierReferenceFinder {
    fn name(&self) -> &'static str {
        "identifier"
    }

    async fn determine_projects_to_search(
        &self,
        symbol: &SymbolAndProject,
        solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<ProjectId>> {
        if solution.project(symbol.project).is_none() {
            anyhow::bail!("{} is declared in a project outside the solution", symbol);
        }
        let mut projects = vec![symbol.project];
        projects.extend(
            solution
                .dependency_graph()
                .transitive_dependents(symbol.project),
        );
        Ok(projects)
    }

    async fn determine_documents_to_search(
        &self,
        symbol: &SymbolAndProject,
        project: &Project,
        solution: &Solution,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<DocumentId>> {
        let name: &str = &symbol.symbol.name;
        let mut documents = Vec::new();
        for document in solution.project_documents(project.id) {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled.into());
            }
            if document.text().contains(name) {
                documents.push(document.id);
            }
        }
        Ok(documents)
    }

    async fn find_references_in_document(
        &self,
        symbol: &SymbolAndProject,
        document: &Document,
        _solution: &Solution,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let regex = self.pattern(&symbol.symbol.name)?;
        let text = document.shared_text();

        for found in regex.find_iter(&text) {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled.into());
            }
            let usage = classify_usage(&text[found.end()..]);
            let location = ReferenceLocation::new(document.id, TextSpan::new(found.start(), found.end()))
                .with_usage(usage);
            sink.on_reference_found(location).await?;
        }
        Ok(())
    }
}

const COMPOUND_ASSIGNMENTS: [&str; 15] = [
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", ">>>=", "**=", "&&=", "||=", "??=",
];

/// Classify an occurrence by the operator that follows it
fn classify_usage(rest: &str) -> ReferenceUsage {
    let rest = rest.trim_start_matches([' ', '\t']);
    if rest.starts_with("++")
        || rest.starts_with("--")
        || COMPOUND_ASSIGNMENTS.iter().any(|op| rest.starts_with(op))
    {
        return ReferenceUsage::ReadWrite;
    }
    // `==` and `=>` read
    if rest.starts_with('=') && !rest.starts_with("==") && !rest.starts_with("=>") {
        ReferenceUsage::Write
    } else {
        ReferenceUsage::Read
    }
}
