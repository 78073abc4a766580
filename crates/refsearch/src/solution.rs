//
// solution.rs
//
// Project model consumed by the reference search engine
//

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::dependency::ProjectDependencyGraph;

/// Stable identifier of a project within one solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProjectId(pub u32);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

/// Stable identifier of a document within one solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(pub u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document#{}", self.0)
    }
}

/// A single source file and the project that owns it
#[derive(Debug)]
pub struct Document {
    pub id: DocumentId,
    pub project: ProjectId,
    pub path: PathBuf,
    text: Arc<str>,
    line_starts: Vec<usize>,
}

impl Document {
    fn new(id: DocumentId, project: ProjectId, path: PathBuf, text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            id,
            project,
            path,
            text: Arc::from(text),
            line_starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the document text, cheap to move into tasks
    pub fn shared_text(&self) -> Arc<str> {
        self.text.clone()
    }

    /// Convert a byte offset into a zero-based (line, column) pair.
    ///
    /// Columns count characters, not bytes. Offsets past the end clamp to the
    /// last position in the document.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line, column)
    }
}

/// A compilation unit grouping with outgoing references to other projects
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub documents: Vec<DocumentId>,
    /// Projects this project depends on
    pub references: Vec<ProjectId>,
}

/// Immutable snapshot of projects, documents and their dependency graph.
///
/// Built once with [`SolutionBuilder`] and shared across a search through an
/// `Arc`. The engine never mutates it.
#[derive(Debug)]
pub struct Solution {
    projects: IndexMap<ProjectId, Project>,
    documents: IndexMap<DocumentId, Arc<Document>>,
    graph: ProjectDependencyGraph,
}

impl Solution {
    pub fn builder() -> SolutionBuilder {
        SolutionBuilder::default()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.name == name)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project_ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.projects.keys().copied()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Arc<Document>> {
        self.documents.get(&id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Documents belonging to a project, in insertion order
    pub fn project_documents(&self, id: ProjectId) -> impl Iterator<Item = &Arc<Document>> {
        self.projects
            .get(&id)
            .into_iter()
            .flat_map(|p| p.documents.iter())
            .filter_map(|doc_id| self.documents.get(doc_id))
    }

    pub fn dependency_graph(&self) -> &ProjectDependencyGraph {
        &self.graph
    }
}

/// Incremental construction of a [`Solution`]
#[derive(Debug, Default)]
pub struct SolutionBuilder {
    projects: IndexMap<ProjectId, Project>,
    documents: IndexMap<DocumentId, Arc<Document>>,
}

impl SolutionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&mut self, name: impl Into<String>) -> ProjectId {
        let id = ProjectId(self.projects.len() as u32);
        self.projects.insert(
            id,
            Project {
                id,
                name: name.into(),
                documents: Vec::new(),
                references: Vec::new(),
            },
        );
        id
    }

    /// Add a document to a project. Returns `None` if the project is unknown.
    pub fn add_document(
        &mut self,
        project: ProjectId,
        path: impl AsRef<Path>,
        text: &str,
    ) -> Option<DocumentId> {
        let id = DocumentId(self.documents.len() as u32);
        let owner = self.projects.get_mut(&project)?;
        owner.documents.push(id);
        self.documents.insert(
            id,
            Arc::new(Document::new(id, project, path.as_ref().to_path_buf(), text)),
        );
        Some(id)
    }

    /// Record that `from` depends on `to`. Duplicate and self edges are ignored.
    pub fn add_project_reference(&mut self, from: ProjectId, to: ProjectId) -> bool {
        if from == to || !self.projects.contains_key(&to) {
            return false;
        }
        match self.projects.get_mut(&from) {
            Some(project) if !project.references.contains(&to) => {
                project.references.push(to);
                true
            }
            _ => false,
        }
    }

    pub fn build(self) -> Solution {
        let graph = ProjectDependencyGraph::from_projects(self.projects.values());
        log::debug!(
            "Built solution with {} projects, {} documents",
            self.projects.len(),
            self.documents.len()
        );
        Solution {
            projects: self.projects,
            documents: self.documents,
            graph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_ids_and_back_references() {
        let mut builder = Solution::builder();
        let a = builder.add_project("A");
        let b = builder.add_project("B");
        let a1 = builder.add_document(a, "a/one.cs", "class One {}").unwrap();
        let b1 = builder.add_document(b, "b/two.cs", "class Two {}").unwrap();
        let solution = builder.build();

        assert_eq!(solution.project_count(), 2);
        assert_eq!(solution.document_count(), 2);
        assert_eq!(solution.document(a1).unwrap().project, a);
        assert_eq!(solution.document(b1).unwrap().project, b);
        assert_eq!(solution.project(a).unwrap().documents, vec![a1]);
        assert_eq!(solution.project_by_name("B").unwrap().id, b);
    }

    #[test]
    fn test_add_document_to_unknown_project() {
        let mut builder = Solution::builder();
        assert!(builder.add_document(ProjectId(7), "x.cs", "").is_none());
    }

    #[test]
    fn test_project_references_ignore_duplicates_and_self_edges() {
        let mut builder = Solution::builder();
        let a = builder.add_project("A");
        let b = builder.add_project("B");
        assert!(builder.add_project_reference(a, b));
        assert!(!builder.add_project_reference(a, b));
        assert!(!builder.add_project_reference(a, a));
        assert!(!builder.add_project_reference(a, ProjectId(99)));
        let solution = builder.build();
        assert_eq!(solution.project(a).unwrap().references, vec![b]);
    }

    #[test]
    fn test_line_column() {
        let mut builder = Solution::builder();
        let p = builder.add_project("P");
        let d = builder.add_document(p, "p.cs", "ab\ncdé\nf").unwrap();
        let solution = builder.build();
        let doc = solution.document(d).unwrap();

        assert_eq!(doc.line_column(0), (0, 0));
        assert_eq!(doc.line_column(1), (0, 1));
        assert_eq!(doc.line_column(3), (1, 0));
        // "é" is two bytes; the offset after it is column 3
        assert_eq!(doc.line_column(7), (1, 3));
        assert_eq!(doc.line_column(8), (2, 0));
        assert_eq!(doc.line_column(1000), (2, 1));
    }
}
