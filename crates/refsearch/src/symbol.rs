//
// symbol.rs
//
// Symbol identities used as the unit of result grouping
//

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::solution::ProjectId;

/// Broad category of a symbol, used by finders to decide applicability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Type,
    Method,
    Property,
    Field,
    Event,
    Parameter,
    Local,
    Other,
}

impl FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "type" | "class" | "struct" | "interface" => Ok(SymbolKind::Type),
            "method" | "function" => Ok(SymbolKind::Method),
            "property" => Ok(SymbolKind::Property),
            "field" => Ok(SymbolKind::Field),
            "event" => Ok(SymbolKind::Event),
            "parameter" => Ok(SymbolKind::Parameter),
            "local" => Ok(SymbolKind::Local),
            "other" => Ok(SymbolKind::Other),
            other => Err(format!("Unknown symbol kind '{}'", other)),
        }
    }
}

/// A resolved symbol as seen by the semantic model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol {
    pub name: Arc<str>,
    pub kind: SymbolKind,
    /// Containing type or namespace, if any
    pub container: Option<Arc<str>>,
}

impl Symbol {
    pub fn new(name: &str, kind: SymbolKind) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            container: None,
        }
    }

    pub fn with_container(mut self, container: &str) -> Self {
        self.container = Some(Arc::from(container));
        self
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(f, "{}.{}", container, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A symbol paired with the project it is viewed from.
///
/// The same logical symbol seen from two projects (say, once from source and
/// once through metadata) forms two distinct identities, and their references
/// are grouped separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolAndProject {
    pub symbol: Symbol,
    pub project: ProjectId,
}

impl SymbolAndProject {
    pub fn new(symbol: Symbol, project: ProjectId) -> Self {
        Self { symbol, project }
    }
}

impl fmt::Display for SymbolAndProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.project)
    }
}
