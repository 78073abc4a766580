//
// config.rs
//
// Configuration for reference searches
//

use std::collections::HashSet;

use crate::solution::{DocumentId, ProjectId, Solution};

/// Per-request search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Expand the initial symbols into their full cascade closure
    pub cascade: bool,
    /// Restrict the search to these documents (and the projects owning them)
    pub document_scope: Option<HashSet<DocumentId>>,
}

impl Default for SearchOptions {
    /// Cascading enabled, whole-solution scope.
    fn default() -> Self {
        Self {
            cascade: true,
            document_scope: None,
        }
    }
}

impl SearchOptions {
    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn with_document_scope(mut self, documents: impl IntoIterator<Item = DocumentId>) -> Self {
        self.document_scope = Some(documents.into_iter().collect());
        self
    }

    /// Whether `document` is inside the requested scope
    pub fn includes_document(&self, document: DocumentId) -> bool {
        self.document_scope
            .as_ref()
            .map_or(true, |scope| scope.contains(&document))
    }

    /// Whether `project` owns at least one document inside the requested scope
    pub fn includes_project(&self, project: ProjectId, solution: &Solution) -> bool {
        match &self.document_scope {
            None => true,
            Some(scope) => solution
                .project(project)
                .map_or(false, |p| p.documents.iter().any(|d| scope.contains(d))),
        }
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub options: SearchOptions,
    /// Report every closure member to the progress sink before searching
    pub report_definitions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            options: SearchOptions::default(),
            report_definitions: true,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `REFSEARCH_NO_CASCADE` when set to a truthy value
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if env_flag("REFSEARCH_NO_CASCADE") {
            config.options.cascade = false;
        }
        config
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_report_definitions(mut self, report: bool) -> Self {
        self.report_definitions = report;
        self
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}
