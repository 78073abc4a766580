//! Progress sink that records every event for later assertions.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::location::ReferenceLocation;
use crate::progress::ProgressSink;
use crate::solution::DocumentId;
use crate::symbol::SymbolAndProject;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started,
    Completed,
    Progress(usize, usize),
    Definition(SymbolAndProject),
    Reference(SymbolAndProject, ReferenceLocation),
    DocumentStarted(DocumentId),
    DocumentCompleted(DocumentId),
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
    /// Cancelled when the first reference is reported
    cancel_on_reference: Option<CancellationToken>,
    completed: Notify,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `token` as soon as a reference is reported
    pub fn cancelling_on_reference(token: CancellationToken) -> Self {
        Self {
            cancel_on_reference: Some(token),
            ..Self::default()
        }
    }

    fn push(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Resolve once `on_completed` has been recorded
    pub async fn wait_for_completed(&self) {
        self.completed.notified().await;
    }

    pub fn progress_reports(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress(completed, total) => Some((completed, total)),
                _ => None,
            })
            .collect()
    }

    pub fn references(&self) -> Vec<(SymbolAndProject, ReferenceLocation)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Reference(symbol, location) => Some((symbol, location)),
                _ => None,
            })
            .collect()
    }

    pub fn definitions(&self) -> Vec<SymbolAndProject> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Definition(symbol) => Some(symbol),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn on_started(&self) {
        self.push(ProgressEvent::Started);
    }

    async fn on_completed(&self) {
        self.push(ProgressEvent::Completed);
        self.completed.notify_one();
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        self.push(ProgressEvent::Progress(completed, total));
    }

    async fn on_definition_found(&self, symbol: &SymbolAndProject) {
        self.push(ProgressEvent::Definition(symbol.clone()));
    }

    async fn on_reference_found(&self, symbol: &SymbolAndProject, location: &ReferenceLocation) {
        self.push(ProgressEvent::Reference(symbol.clone(), location.clone()));
        if let Some(token) = &self.cancel_on_reference {
            token.cancel();
        }
    }

    async fn on_find_in_document_started(&self, document: DocumentId) {
        self.push(ProgressEvent::DocumentStarted(document));
    }

    async fn on_find_in_document_completed(&self, document: DocumentId) {
        self.push(ProgressEvent::DocumentCompleted(document));
    }
}
