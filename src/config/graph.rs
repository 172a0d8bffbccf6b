// src/config/graph.rs

//! Job dependency graph built from the `after` lists of a manifest.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::config::model::JobConfig;

/// Build the dependency graph of `jobs`.
///
/// Edge direction: dep -> job. For
///
/// ```toml
/// [job.B]
/// after = ["A"]
/// ```
///
/// we add edge A -> B. Unknown `after` entries become extra nodes, so
/// callers should reject them before relying on the graph.
pub(crate) fn dependency_graph(jobs: &BTreeMap<String, JobConfig>) -> DiGraphMap<&str, ()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in jobs.keys() {
        graph.add_node(name.as_str());
    }

    for (name, job) in jobs.iter() {
        for dep in job.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    graph
}

/// Topological order of `graph` where, among the jobs whose dependencies are
/// all placed, the smallest id goes first.
///
/// Nodes on a cycle never become ready and are left out.
pub(crate) fn admission_order(graph: &DiGraphMap<&str, ()>) -> Vec<String> {
    let mut pending: HashMap<&str, usize> = graph
        .nodes()
        .map(|node| (node, graph.neighbors_directed(node, Direction::Incoming).count()))
        .collect();

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, deps)| **deps == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut order = Vec::with_capacity(pending.len());
    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            if let Some(deps) = pending.get_mut(next) {
                *deps -= 1;
                if *deps == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    order
}
