//
// error.rs
//
// Error taxonomy for reference searches
//

use std::any::Any;

use tokio_util::sync::CancellationToken;

use crate::solution::{DocumentId, ProjectId};

/// Errors that terminate a find-references request.
///
/// Every variant is fatal to the whole request: there is no per-item retry and
/// no partial result. `Cancelled` is an expected outcome rather than a fault.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("reference search was cancelled")]
    Cancelled,

    #[error("reference finder '{finder}' failed: {source}")]
    Finder {
        finder: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("reference finder nominated unknown project {0}")]
    UnknownProject(ProjectId),

    #[error("reference finder nominated unknown document {0}")]
    UnknownDocument(DocumentId),

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// A search stage or document task panicked
    #[error("search task failed: {0}")]
    TaskFailed(String),
}

impl SearchError {
    /// Classify an error raised by a reference finder.
    ///
    /// A failure observed after cancellation, or one that wraps
    /// `SearchError::Cancelled` (e.g. propagated from a [`ReferenceSink`]),
    /// is reported as cancellation rather than as a fault.
    ///
    /// [`ReferenceSink`]: crate::finder::ReferenceSink
    pub fn from_finder(
        finder: &'static str,
        error: anyhow::Error,
        cancel: &CancellationToken,
    ) -> Self {
        if cancel.is_cancelled() {
            return SearchError::Cancelled;
        }
        match error.downcast::<SearchError>() {
            Ok(search_error) => search_error,
            Err(source) => SearchError::Finder { finder, source },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::Cancelled)
    }

    /// Convert a caught panic payload into `TaskFailed`
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        SearchError::TaskFailed(message)
    }
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Bail out with `SearchError::Cancelled` if the token has fired.
pub fn check_cancelled(cancel: &CancellationToken) -> SearchResult<()> {
    if cancel.is_cancelled() {
        Err(SearchError::Cancelled)
    } else {
        Ok(())
    }
}

/// Check an internal invariant in debug builds only.
///
/// Returns `Err(SearchError::Invariant(..))` from the enclosing function when
/// the condition fails. In release builds the condition is not evaluated and
/// a violation goes undetected.
#[macro_export]
macro_rules! debug_invariant {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(debug_assertions) && !($cond) {
            return Err($crate::error::SearchError::Invariant(format!($($arg)+)));
        }
    };
}
