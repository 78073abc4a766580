// lib.rs - Library surface of the refsearch find-references coordinator.
//
// The binary entry point lives in main.rs and only drives `cli`. Hosts that
// embed the engine supply their own `Solution` and `ReferenceFinder`s.

pub mod cli;
pub mod config;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod finder;
pub mod finders;
pub mod location;
pub mod perf;
pub mod progress;
pub mod solution;
pub mod symbol;
pub mod workspace;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use config::{EngineConfig, SearchOptions};
pub use engine::FindReferencesEngine;
pub use error::{SearchError, SearchResult};
pub use finder::{ReferenceFinder, ReferenceSink};
pub use location::{ReferenceLocation, ReferenceUsage, ReferencedSymbol, TextSpan};
pub use progress::{LoggingProgress, NullProgress, ProgressSink};
pub use solution::{Document, DocumentId, Project, ProjectId, Solution, SolutionBuilder};
pub use symbol::{Symbol, SymbolAndProject, SymbolKind};
