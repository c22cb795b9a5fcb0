use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::error::{BuildError, RegistryError};

/// The body of a task. Runs to completion or returns the first error it hits.
pub type TaskFn = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

pub(crate) struct Task {
    pub(crate) name: String,
    pub(crate) deps: Vec<String>,
    pub(crate) body: TaskFn,
}

/// Collects named tasks and their dependency lists before validation.
///
/// Nothing is checked at registration time; [`Registry::seal`] validates
/// the whole set at once and produces the executable graph.
#[derive(Default)]
pub struct Registry {
    tasks: Vec<Task>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task under a unique name.
    ///
    /// Dependencies are referenced by name and may be registered in any
    /// order relative to their dependents.
    pub fn add<F>(&mut self, name: &str, deps: &[&str], body: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.tasks.push(Task {
            name: name.to_string(),
            deps: deps.iter().map(|dep| dep.to_string()).collect(),
            body: Box::new(body),
        });
        self
    }

    /// Validates the collected tasks and materializes the dependency graph.
    ///
    /// Rejects duplicate names, dependencies on unregistered tasks and
    /// dependency cycles. Edges point from a dependency to its dependents.
    pub fn seal(self) -> Result<TaskGraph, RegistryError> {
        let mut graph = DiGraph::<Task, ()>::new();
        let mut index = HashMap::<String, NodeIndex>::new();

        for task in self.tasks {
            if index.contains_key(&task.name) {
                return Err(RegistryError::Duplicate(task.name));
            }
            let name = task.name.clone();
            let node = graph.add_node(task);
            index.insert(name, node);
        }

        let nodes: Vec<_> = graph.node_indices().collect();
        for node in nodes {
            let deps = graph[node].deps.clone();
            for dep in deps {
                let Some(&dep_node) = index.get(&dep) else {
                    return Err(RegistryError::UnknownDependency {
                        task: graph[node].name.clone(),
                        dependency: dep,
                    });
                };
                graph.add_edge(dep_node, node, ());
            }
        }

        if let Err(cycle) = petgraph::algo::toposort(&graph, None) {
            return Err(RegistryError::Cycle(graph[cycle.node_id()].name.clone()));
        }

        Ok(TaskGraph { graph, index })
    }
}

/// A validated task graph, ready for execution.
pub struct TaskGraph {
    pub(crate) graph: DiGraph<Task, ()>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph").finish_non_exhaustive()
    }
}

impl TaskGraph {
    pub(crate) fn node(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    /// Returns the requested nodes together with their transitive
    /// dependencies, walking the graph against the edge direction.
    pub(crate) fn closure(&self, names: &[&str]) -> Result<HashSet<NodeIndex>, BuildError> {
        let mut set = HashSet::new();
        let reversed = Reversed(&self.graph);

        for name in names {
            let start = self
                .node(name)
                .ok_or_else(|| BuildError::Unknown(name.to_string()))?;

            let mut dfs = Dfs::new(reversed, start);
            while let Some(node) = dfs.next(reversed) {
                set.insert(node);
            }
        }

        Ok(set)
    }
}
