//
// dependency.rs
//
// Project dependency graph and its weakly-connected decomposition
//

use std::collections::{HashMap, HashSet, VecDeque};

use crate::solution::{Project, ProjectId};

/// Directed graph of project references.
///
/// An edge `a -> b` means project `a` references (depends on) project `b`.
/// The graph is used for scheduling locality and for solution visibility; it
/// never affects which references are considered correct.
#[derive(Debug, Clone, Default)]
pub struct ProjectDependencyGraph {
    /// Projects in solution order
    projects: Vec<ProjectId>,
    /// Outgoing edges: project -> projects it references
    forward: HashMap<ProjectId, Vec<ProjectId>>,
    /// Incoming edges: project -> projects that reference it
    backward: HashMap<ProjectId, Vec<ProjectId>>,
}

impl ProjectDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_projects<'a>(projects: impl IntoIterator<Item = &'a Project>) -> Self {
        let mut graph = Self::new();
        let projects: Vec<&Project> = projects.into_iter().collect();
        for project in &projects {
            graph.add_project(project.id);
        }
        for project in &projects {
            for &dep in &project.references {
                graph.add_edge(project.id, dep);
            }
        }
        graph
    }

    pub fn add_project(&mut self, id: ProjectId) {
        if !self.forward.contains_key(&id) {
            self.projects.push(id);
            self.forward.insert(id, Vec::new());
            self.backward.insert(id, Vec::new());
        }
    }

    /// Add an edge `from -> to`, registering either endpoint if needed
    pub fn add_edge(&mut self, from: ProjectId, to: ProjectId) {
        self.add_project(from);
        self.add_project(to);
        let out = self.forward.entry(from).or_default();
        if !out.contains(&to) {
            out.push(to);
            self.backward.entry(to).or_default().push(from);
        }
    }

    pub fn contains(&self, id: ProjectId) -> bool {
        self.forward.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Projects that `id` references directly
    pub fn dependencies(&self, id: ProjectId) -> &[ProjectId] {
        self.forward.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Projects that reference `id` directly
    pub fn direct_dependents(&self, id: ProjectId) -> &[ProjectId] {
        self.backward.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All projects that can see `id` through a chain of references,
    /// excluding `id` itself. Order is breadth-first from `id`.
    pub fn transitive_dependents(&self, id: ProjectId) -> Vec<ProjectId> {
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut result = Vec::new();
        while let Some(current) = queue.pop_front() {
            for &dependent in self.direct_dependents(current) {
                if visited.insert(dependent) {
                    result.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }
        result
    }

    /// Decompose the graph into weakly-connected components.
    ///
    /// Every project appears in exactly one set. Sets are returned in order of
    /// their first project in solution order; within a set, projects are
    /// ordered dependencies-first (cycles fall back to solution order for the
    /// projects involved).
    pub fn dependency_sets(&self) -> Vec<Vec<ProjectId>> {
        let mut assigned: HashSet<ProjectId> = HashSet::new();
        let mut sets = Vec::new();

        for &root in &self.projects {
            if !assigned.insert(root) {
                continue;
            }
            let mut members = HashSet::from([root]);
            let mut queue = VecDeque::from([root]);
            while let Some(current) = queue.pop_front() {
                let neighbours = self
                    .dependencies(current)
                    .iter()
                    .chain(self.direct_dependents(current));
                for &next in neighbours {
                    if assigned.insert(next) {
                        members.insert(next);
                        queue.push_back(next);
                    }
                }
            }
            sets.push(self.topological_order(&members));
        }

        log::trace!(
            "Dependency graph with {} projects decomposed into {} sets",
            self.projects.len(),
            sets.len()
        );
        sets
    }

    /// Order `members` so that dependencies precede their dependents
    fn topological_order(&self, members: &HashSet<ProjectId>) -> Vec<ProjectId> {
        let ordered: Vec<ProjectId> = self
            .projects
            .iter()
            .copied()
            .filter(|p| members.contains(p))
            .collect();

        let mut pending: HashMap<ProjectId, usize> = ordered
            .iter()
            .map(|&p| (p, self.dependencies(p).len()))
            .collect();
        let mut ready: VecDeque<ProjectId> = ordered
            .iter()
            .copied()
            .filter(|p| pending[p] == 0)
            .collect();
        let mut result = Vec::with_capacity(ordered.len());
        let mut emitted = HashSet::new();

        while let Some(project) = ready.pop_front() {
            emitted.insert(project);
            result.push(project);
            for &dependent in self.direct_dependents(project) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }

        if result.len() < ordered.len() {
            log::trace!(
                "Cycle among {} projects, falling back to solution order",
                ordered.len() - result.len()
            );
            result.extend(ordered.into_iter().filter(|p| !emitted.contains(p)));
        }
        result
    }

    /// Find a project reference cycle reachable from `id`, if any.
    ///
    /// Returns the edge that closes the cycle.
    pub fn detect_cycle(&self, id: ProjectId) -> Option<(ProjectId, ProjectId)> {
        let mut on_stack = HashSet::new();
        let mut done = HashSet::new();
        self.detect_cycle_recursive(id, &mut on_stack, &mut done)
    }

    fn detect_cycle_recursive(
        &self,
        id: ProjectId,
        on_stack: &mut HashSet<ProjectId>,
        done: &mut HashSet<ProjectId>,
    ) -> Option<(ProjectId, ProjectId)> {
        if done.contains(&id) {
            return None;
        }
        on_stack.insert(id);
        for &dep in self.dependencies(id) {
            if on_stack.contains(&dep) {
                return Some((id, dep));
            }
            if let Some(edge) = self.detect_cycle_recursive(dep, on_stack, done) {
                return Some(edge);
            }
        }
        on_stack.remove(&id);
        done.insert(id);
        None
    }
}
