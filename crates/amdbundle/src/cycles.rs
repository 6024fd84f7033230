//! Cycle detection over discovered files
//!
//! Only used for diagnostics: the orderer never fails on a cycle, but when its
//! fallback kicks in it reports which files actually form cycles.

use std::path::PathBuf;

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::FxHashMap;

use crate::{types::DiscoveredFile, util::path_key};

/// Groups of files that depend on each other, directly or transitively.
///
/// A file depending on itself is reported as a group of one. Dependencies on
/// files outside `files` are ignored.
pub fn find_cycles(files: &[DiscoveredFile]) -> Vec<Vec<PathBuf>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(files.len(), 0);
    let mut nodes: FxHashMap<String, NodeIndex> = FxHashMap::default();
    for (position, file) in files.iter().enumerate() {
        let node = graph.add_node(position);
        nodes.insert(path_key(&file.path), node);
    }

    for (position, file) in files.iter().enumerate() {
        let from = NodeIndex::new(position);
        for dependency in &file.dependencies {
            if let Some(&to) = nodes.get(&path_key(dependency)) {
                graph.update_edge(from, to, ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || graph.contains_edge(component[0], component[0])
        })
        .map(|mut component| {
            component.sort_by_key(|node| graph[*node]);
            component
                .into_iter()
                .map(|node| files[graph[node]].path.clone())
                .collect()
        })
        .collect()
}
