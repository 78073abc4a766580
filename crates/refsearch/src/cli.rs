// cli.rs - `refsearch <manifest> <symbol>` command
//
// Loads a solution from a manifest, resolves the requested symbol to the
// project declaring it and prints every reference found by the built-in
// finders, either as `path:line:col` lines or as JSON.

use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::FindReferencesEngine;
use crate::finders::default_finders;
use crate::location::{ReferenceUsage, ReferencedSymbol};
use crate::perf::TimingGuard;
use crate::progress::LoggingProgress;
use crate::solution::Solution;
use crate::symbol::{Symbol, SymbolAndProject, SymbolKind};
use crate::workspace;

/// Parsed arguments for a search.
#[derive(Debug, PartialEq)]
pub struct SearchArgs {
    pub manifest: PathBuf,
    pub symbol: String,
    pub project: Option<String>,
    pub kind: SymbolKind,
    pub container: Option<String>,
    pub cascade: bool,
    pub json: bool,
}

/// Parse search arguments.
///
/// Expected usage: `refsearch <manifest.json> <symbol> [--project NAME]
/// [--kind KIND] [--container NAME] [--no-cascade] [--json]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<SearchArgs, String> {
    let mut positional: Vec<String> = Vec::new();
    let mut project = None;
    let mut kind = SymbolKind::Other;
    let mut container = None;
    let mut cascade = true;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--project" => {
                project = Some(
                    args.next()
                        .ok_or_else(|| "--project requires a project name".to_string())?,
                );
            }
            "--kind" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--kind requires a symbol kind".to_string())?;
                kind = value.parse()?;
            }
            "--container" => {
                container = Some(
                    args.next()
                        .ok_or_else(|| "--container requires a name".to_string())?,
                );
            }
            "--no-cascade" => cascade = false,
            "--json" => json = true,
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let manifest = positional
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| "Missing required <manifest> argument".to_string())?;
    let symbol = positional
        .next()
        .ok_or_else(|| "Missing required <symbol> argument".to_string())?;
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument: '{}'", extra));
    }

    Ok(SearchArgs {
        manifest,
        symbol,
        project,
        kind,
        container,
        cascade,
        json,
    })
}

/// Run a search and render its output.
pub async fn run_search(args: &SearchArgs, cancel: CancellationToken) -> anyhow::Result<String> {
    let solution = {
        let _guard = TimingGuard::new("refsearch:load");
        Arc::new(
            workspace::load_solution(&args.manifest)
                .with_context(|| format!("Failed to load {}", args.manifest.display()))?,
        )
    };
    let symbol = resolve_symbol(&solution, args)?;
    log::info!("Searching for references to {}", symbol);

    let mut config = EngineConfig::from_env();
    if !args.cascade {
        config.options.cascade = false;
    }
    let engine = FindReferencesEngine::new(
        solution.clone(),
        default_finders(),
        Arc::new(LoggingProgress),
    )
    .with_config(config);

    let results = engine.find_references(symbol, cancel).await?;
    if args.json {
        render_json(&solution, &results)
    } else {
        Ok(render_text(&solution, &results))
    }
}

/// Pair the requested name with the project that declares it.
///
/// Without `--project`, the first project (in manifest order) whose documents
/// mention the name is taken as the declaring one.
pub fn resolve_symbol(solution: &Solution, args: &SearchArgs) -> anyhow::Result<SymbolAndProject> {
    let mut symbol = Symbol::new(&args.symbol, args.kind);
    if let Some(container) = &args.container {
        symbol = symbol.with_container(container);
    }

    let project = match &args.project {
        Some(name) => solution
            .project_by_name(name)
            .with_context(|| format!("No project named '{}' in the solution", name))?,
        None => {
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&args.symbol)))?;
            solution
                .projects()
                .find(|project| {
                    solution
                        .project_documents(project.id)
                        .any(|doc| pattern.is_match(doc.text()))
                })
                .with_context(|| format!("'{}' does not occur in any project", args.symbol))?
        }
    };
    Ok(SymbolAndProject::new(symbol, project.id))
}

/// One `path:line:col` line per location, grouped under each symbol
pub fn render_text(solution: &Solution, results: &[ReferencedSymbol]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        out.push_str("No references found\n");
        return out;
    }
    for referenced in results {
        let project = solution
            .project(referenced.definition.project)
            .map_or("?", |p| p.name.as_str());
        let _ = writeln!(
            out,
            "{} [{}]: {} reference(s)",
            referenced.definition.symbol,
            project,
            referenced.locations.len()
        );
        for location in &referenced.locations {
            let Some(document) = solution.document(location.document) else {
                continue;
            };
            let (line, column) = document.line_column(location.span.start);
            let usage = match location.usage {
                ReferenceUsage::Read => "",
                ReferenceUsage::Write => " (write)",
                ReferenceUsage::ReadWrite => " (read/write)",
            };
            let _ = writeln!(
                out,
                "  {}:{}:{}{}",
                document.path.display(),
                line + 1,
                column + 1,
                usage
            );
        }
    }
    out
}

#[derive(Serialize)]
struct JsonSymbol<'a> {
    symbol: String,
    kind: SymbolKind,
    project: &'a str,
    locations: Vec<JsonLocation>,
}

#[derive(Serialize)]
struct JsonLocation {
    path: String,
    line: usize,
    column: usize,
    usage: ReferenceUsage,
    implicit: bool,
}

pub fn render_json(solution: &Solution, results: &[ReferencedSymbol]) -> anyhow::Result<String> {
    let symbols: Vec<JsonSymbol> = results
        .iter()
        .map(|referenced| JsonSymbol {
            symbol: referenced.definition.symbol.to_string(),
            kind: referenced.definition.symbol.kind,
            project: solution
                .project(referenced.definition.project)
                .map_or("", |p| p.name.as_str()),
            locations: referenced
                .locations
                .iter()
                .filter_map(|location| {
                    let document = solution.document(location.document)?;
                    let (line, column) = document.line_column(location.span.start);
                    Some(JsonLocation {
                        path: document.path.display().to_string(),
                        line: line + 1,
                        column: column + 1,
                        usage: location.usage,
                        implicit: location.is_implicit,
                    })
                })
                .collect(),
        })
        .collect();
    let mut json = serde_json::to_string_pretty(&symbols)?;
    json.push('\n');
    Ok(json)
}
