//! Deterministic fixture solution generator for benchmarks and tests.
//!
//! Generates synthetic solutions with controlled characteristics: number of
//! dependency sets, projects per set, documents per project and references
//! to a target symbol per document.
//!
//! All output is deterministic (no randomness) so benchmarks are reproducible.

use std::fmt::Write;

use crate::solution::{ProjectId, Solution};
use crate::symbol::{Symbol, SymbolAndProject, SymbolKind};

/// Name of the symbol every fixture document references
pub const TARGET_SYMBOL: &str = "Target";

/// Configuration for generating a fixture solution.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// Number of independent dependency sets
    pub dependency_sets: usize,
    /// Projects chained by references inside each set
    pub projects_per_set: usize,
    pub documents_per_project: usize,
    pub references_per_document: usize,
    pub filler_lines_per_document: usize,
}

impl FixtureConfig {
    /// Small solution: 2 sets of 3 projects, 5 documents each.
    pub fn small() -> Self {
        Self {
            dependency_sets: 2,
            projects_per_set: 3,
            documents_per_project: 5,
            references_per_document: 2,
            filler_lines_per_document: 10,
        }
    }

    /// Medium solution: 5 sets of 5 projects, 20 documents each.
    pub fn medium() -> Self {
        Self {
            dependency_sets: 5,
            projects_per_set: 5,
            documents_per_project: 20,
            references_per_document: 4,
            filler_lines_per_document: 40,
        }
    }

    /// Large solution: 10 sets of 10 projects, 50 documents each.
    pub fn large() -> Self {
        Self {
            dependency_sets: 10,
            projects_per_set: 10,
            documents_per_project: 50,
            references_per_document: 8,
            filler_lines_per_document: 100,
        }
    }
}

/// Generate the text of one document deterministically.
fn generate_document(project: usize, index: usize, config: &FixtureConfig) -> String {
    let mut text = String::new();
    writeln!(text, "namespace P{};", project).unwrap();
    writeln!(text, "class C{}_{} {{", project, index).unwrap();
    // Spread the references evenly through the filler
    let step = (config.filler_lines_per_document / config.references_per_document.max(1)).max(1);
    for line in 0..config.filler_lines_per_document {
        writeln!(text, "    int filler{} = {};", line, line * 7 % 13).unwrap();
        if line % step == 0 && line / step < config.references_per_document {
            writeln!(text, "    void Use{}() {{ {}.Run(); }}", line, TARGET_SYMBOL).unwrap();
        }
    }
    writeln!(text, "}}").unwrap();
    text
}

/// Build a fixture solution.
///
/// Within each dependency set, project `k` references project `k - 1`, so the
/// first project of every set is the root that all others can see. Returns the
/// solution and one target symbol identity per set (declared in its root).
pub fn create_fixture_solution(config: &FixtureConfig) -> (Solution, Vec<SymbolAndProject>) {
    let mut builder = Solution::builder();
    let mut roots = Vec::new();
    let mut project_index = 0;

    for set in 0..config.dependency_sets {
        let mut previous: Option<ProjectId> = None;
        for member in 0..config.projects_per_set {
            let project = builder.add_project(format!("set{}_project{}", set, member));
            for doc in 0..config.documents_per_project {
                let text = generate_document(project_index, doc, config);
                builder.add_document(
                    project,
                    format!("set{}/project{}/file{}.cs", set, member, doc),
                    &text,
                );
            }
            match previous {
                Some(dependency) => {
                    builder.add_project_reference(project, dependency);
                }
                None => roots.push(project),
            }
            previous = Some(project);
            project_index += 1;
        }
    }

    let targets = roots
        .into_iter()
        .map(|root| SymbolAndProject::new(Symbol::new(TARGET_SYMBOL, SymbolKind::Type), root))
        .collect();
    (builder.build(), targets)
}
