//! A reference finder whose answers are scripted up front.
//!
//! Each stage of the finder contract returns exactly what the test registered
//! for it, which makes the engine's orchestration observable without a real
//! semantic model.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::finder::{ReferenceFinder, ReferenceSink};
use crate::location::ReferenceLocation;
use crate::solution::{Document, DocumentId, Project, ProjectId, Solution};
use crate::symbol::SymbolAndProject;

/// Which stage of the finder contract should fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailAt {
    Cascade,
    Projects,
    Documents,
    Document(DocumentId),
}

#[derive(Debug, Default)]
pub struct ScriptedFinder {
    name: &'static str,
    cascades: HashMap<SymbolAndProject, Vec<SymbolAndProject>>,
    projects: HashMap<SymbolAndProject, Vec<ProjectId>>,
    documents: HashMap<(SymbolAndProject, ProjectId), Vec<DocumentId>>,
    hits: HashMap<(SymbolAndProject, DocumentId), Vec<ReferenceLocation>>,
    fail_at: Option<FailAt>,
    panic_at: Option<FailAt>,
    search_delay: Option<Duration>,
    searched: Mutex<Vec<(SymbolAndProject, DocumentId)>>,
}

impl ScriptedFinder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// `from` cascades to `to`
    pub fn cascade(mut self, from: &SymbolAndProject, to: &SymbolAndProject) -> Self {
        self.cascades
            .entry(from.clone())
            .or_default()
            .push(to.clone());
        self
    }

    /// Nominate `project` and `documents` within it as candidates for `symbol`
    pub fn scope(
        mut self,
        symbol: &SymbolAndProject,
        project: ProjectId,
        documents: &[DocumentId],
    ) -> Self {
        let projects = self.projects.entry(symbol.clone()).or_default();
        if !projects.contains(&project) {
            projects.push(project);
        }
        self.documents
            .entry((symbol.clone(), project))
            .or_default()
            .extend_from_slice(documents);
        self
    }

    /// Nominate a project without checking for duplicates
    pub fn raw_project(mut self, symbol: &SymbolAndProject, project: ProjectId) -> Self {
        self.projects.entry(symbol.clone()).or_default().push(project);
        self
    }

    /// Report `location` when searching its document for `symbol`
    pub fn hit(mut self, symbol: &SymbolAndProject, location: ReferenceLocation) -> Self {
        self.hits
            .entry((symbol.clone(), location.document))
            .or_default()
            .push(location);
        self
    }

    pub fn fail_at(mut self, stage: FailAt) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Panic instead of returning an error at `stage`
    pub fn panic_at(mut self, stage: FailAt) -> Self {
        self.panic_at = Some(stage);
        self
    }

    /// Sleep before searching each document
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// (symbol, document) pairs searched so far, in call order
    pub fn searched(&self) -> Vec<(SymbolAndProject, DocumentId)> {
        self.searched.lock().unwrap().clone()
    }

    fn check_fail(&self, stage: FailAt) -> anyhow::Result<()> {
        if self.panic_at.as_ref() == Some(&stage) {
            panic!("{} panicked at {:?}", self.name, stage);
        }
        if self.fail_at.as_ref() == Some(&stage) {
            anyhow::bail!("{} failed at {:?}", self.name, stage);
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceFinder for ScriptedFinder {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn determine_cascaded_symbols(
        &self,
        symbol: &SymbolAndProject,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<SymbolAndProject>> {
        self.check_fail(FailAt::Cascade)?;
        Ok(self.cascades.get(symbol).cloned().unwrap_or_default())
    }

    async fn determine_projects_to_search(
        &self,
        symbol: &SymbolAndProject,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<ProjectId>> {
        self.check_fail(FailAt::Projects)?;
        Ok(self.projects.get(symbol).cloned().unwrap_or_default())
    }

    async fn determine_documents_to_search(
        &self,
        symbol: &SymbolAndProject,
        project: &Project,
        _solution: &Solution,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<DocumentId>> {
        self.check_fail(FailAt::Documents)?;
        Ok(self
            .documents
            .get(&(symbol.clone(), project.id))
            .cloned()
            .unwrap_or_default())
    }

    async fn find_references_in_document(
        &self,
        symbol: &SymbolAndProject,
        document: &Document,
        _solution: &Solution,
        sink: &dyn ReferenceSink,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.searched
            .lock()
            .unwrap()
            .push((symbol.clone(), document.id));

        if let Some(delay) = self.search_delay {
            tokio::select! {
                _ = cancel.cancelled() => anyhow::bail!("interrupted"),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.check_fail(FailAt::Document(document.id))?;

        let hits = self
            .hits
            .get(&(symbol.clone(), document.id))
            .cloned()
            .unwrap_or_default();
        for location in hits {
            sink.on_reference_found(location).await?;
        }
        Ok(())
    }
}
