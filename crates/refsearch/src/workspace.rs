//
// workspace.rs
//
// Loads a solution from a JSON manifest and the files under each project root
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::solution::{ProjectId, Solution};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("I/O error for path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Project '{project}' references unknown project '{reference}'")]
    UnknownProjectReference { project: String, reference: String },

    #[error("Project '{0}' is declared more than once")]
    DuplicateProject(String),

    #[error("Root of project '{project}' is not a directory: {root}")]
    MissingRoot { project: String, root: PathBuf },
}

/// Solution manifest.
///
/// ```json
/// {
///   "projects": [
///     { "name": "core", "root": "src/core", "extensions": ["cs"] },
///     { "name": "app", "root": "src/app", "extensions": ["cs"], "references": ["core"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub projects: Vec<ProjectManifest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    pub name: String,
    /// Directory holding the project's documents, relative to the manifest
    pub root: PathBuf,
    /// File extensions to load, without the dot. Empty loads every file.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Names of projects this project depends on
    #[serde(default)]
    pub references: Vec<String>,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl ProjectManifest {
    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
    }
}

/// Read the manifest at `manifest_path` and load every project it lists.
///
/// Project roots resolve relative to the manifest's directory.
pub fn load_solution(manifest_path: &Path) -> Result<Solution, WorkspaceError> {
    let text = std::fs::read_to_string(manifest_path).map_err(|source| WorkspaceError::Io {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    let manifest = Manifest::from_json(&text).map_err(|source| WorkspaceError::Json {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
    build_solution(&manifest, base_dir)
}

/// Build a solution from an already-parsed manifest
pub fn build_solution(manifest: &Manifest, base_dir: &Path) -> Result<Solution, WorkspaceError> {
    let mut builder = Solution::builder();
    let mut ids: HashMap<&str, ProjectId> = HashMap::new();

    for project in &manifest.projects {
        if ids.contains_key(project.name.as_str()) {
            return Err(WorkspaceError::DuplicateProject(project.name.clone()));
        }
        let id = builder.add_project(project.name.clone());
        ids.insert(&project.name, id);

        let root = base_dir.join(&project.root);
        if !root.is_dir() {
            return Err(WorkspaceError::MissingRoot {
                project: project.name.clone(),
                root,
            });
        }
        for path in discover_files(&root, project) {
            let bytes = std::fs::read(&path).map_err(|source| WorkspaceError::Io {
                path: path.clone(),
                source,
            })?;
            let text = String::from_utf8_lossy(&bytes);
            builder.add_document(id, &path, &text);
        }
    }

    for project in &manifest.projects {
        let from = ids[project.name.as_str()];
        for reference in &project.references {
            let to = ids.get(reference.as_str()).copied().ok_or_else(|| {
                WorkspaceError::UnknownProjectReference {
                    project: project.name.clone(),
                    reference: reference.clone(),
                }
            })?;
            if !builder.add_project_reference(from, to) {
                log::warn!(
                    "Ignoring reference from '{}' to '{}' (duplicate or self reference)",
                    project.name,
                    reference
                );
            }
        }
    }

    let solution = builder.build();
    for project in solution.projects() {
        if let Some((from, to)) = solution.dependency_graph().detect_cycle(project.id) {
            log::warn!("Project reference cycle through {} -> {}", from, to);
            break;
        }
    }
    log::info!(
        "Loaded {} projects with {} documents",
        solution.project_count(),
        solution.document_count()
    );
    Ok(solution)
}

/// Files under `root` accepted by the project, sorted, skipping hidden entries
fn discover_files(root: &Path, project: &ProjectManifest) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && project.accepts(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    log::trace!("Project '{}': {} file(s)", project.name, files.len());
    files
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
