use std::collections::{HashMap, HashSet};
use std::sync::mpsc::channel;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::error::BuildError;
use crate::registry::TaskGraph;

/// Runs one task together with its transitive dependencies.
pub fn run(tasks: &TaskGraph, name: &str) -> Result<(), BuildError> {
    let nodes = tasks.closure(&[name])?;
    run_stage(tasks, &nodes, &mut HashSet::new())
}

/// Runs stages strictly in order.
///
/// A stage begins only after every task of the previous stage, dependencies
/// included, has completed. Within a stage tasks run as their dependencies
/// finish, with no further ordering. A task completed by an earlier stage is
/// not run again.
pub fn run_sequence(tasks: &TaskGraph, stages: &[&[&str]]) -> Result<(), BuildError> {
    let mut done = HashSet::new();

    for stage in stages {
        let mut nodes = tasks.closure(stage)?;
        nodes.retain(|node| !done.contains(node));
        run_stage(tasks, &nodes, &mut done)?;
    }

    Ok(())
}

/// Executes one set of nodes on the thread pool, in dependency order.
///
/// The algorithm is a parallel topological walk:
/// 1. Dependency counts are computed for every node in the set; a
///    dependency outside the set is treated as already satisfied.
/// 2. Nodes with no pending dependencies are seeded onto the pool.
/// 3. The calling thread waits on a channel of completions. Each completion
///    decrements the counts of its dependents, and any count reaching zero
///    puts that node on the pool.
/// 4. The first task failure aborts the walk; tasks not yet started never
///    start, tasks already running finish unobserved.
fn run_stage(
    tasks: &TaskGraph,
    nodes_to_run: &HashSet<NodeIndex>,
    done: &mut HashSet<NodeIndex>,
) -> Result<(), BuildError> {
    let graph = &tasks.graph;

    // Map from a dependency to the nodes that depend on it, for the entire graph.
    let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for edge in graph.raw_edges() {
        dependents
            .entry(edge.source())
            .or_default()
            .push(edge.target());
    }

    // Count dependencies for each node that we intend to run.
    // A dependency only counts if it's also in the set of nodes to run.
    let mut dependency_counts: HashMap<NodeIndex, usize> = nodes_to_run
        .iter()
        .map(|&i| {
            (
                i,
                graph
                    .neighbors_directed(i, Direction::Incoming)
                    .filter(|dep| nodes_to_run.contains(dep))
                    .count(),
            )
        })
        .collect();

    let total_tasks = nodes_to_run.len() as u64;
    let mut completed_tasks = 0;

    if total_tasks == 0 {
        return Ok(());
    }

    let mp = MultiProgress::new();
    let main_pb = mp.add(ProgressBar::new(total_tasks));
    main_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    main_pb.set_message("Running tasks...");

    let spinner_style = ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .unwrap();

    rayon::scope(|s| -> Result<(), BuildError> {
        let (result_sender, result_receiver) = channel::<(NodeIndex, anyhow::Result<()>)>();

        let spawn_task = |index: NodeIndex| {
            let task = &graph[index];
            let sender = result_sender.clone();
            let mp = mp.clone();
            let style = spinner_style.clone();

            s.spawn(move |_| {
                let task_pb = mp.add(ProgressBar::new_spinner());
                task_pb.set_style(style);
                task_pb.set_message(task.name.clone());
                task_pb.enable_steady_tick(Duration::from_millis(100));

                tracing::debug!(task = %task.name, "starting");
                let output = (task.body)();

                task_pb.finish_and_clear();

                // The receiver is gone when an earlier failure aborted the
                // stage; there is nobody left to notify then.
                let _ = sender.send((index, output));
            });
        };

        // Seed initial tasks
        for &node in nodes_to_run {
            if dependency_counts.get(&node).copied().unwrap_or(0) == 0 {
                spawn_task(node);
            }
        }

        // Scheduler loop
        // The main thread sits here while Rayon workers execute tasks.
        while completed_tasks < total_tasks {
            let (completed, output) = result_receiver.recv().unwrap();

            if let Err(err) = output {
                return Err(BuildError::Task(graph[completed].name.clone(), err));
            }

            done.insert(completed);
            completed_tasks += 1;
            main_pb.inc(1);

            // Unlock dependents
            if let Some(dependents_of_completed) = dependents.get(&completed) {
                for &index in dependents_of_completed {
                    if let Some(count) = dependency_counts.get_mut(&index) {
                        *count -= 1;
                        if *count == 0 {
                            spawn_task(index);
                        }
                    }
                }
            }
        }

        Ok(())
    })?;

    main_pb.finish_and_clear();
    Ok(())
}
