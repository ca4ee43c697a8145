//! Source-to-target lineage paths

use crate::index::DependencyIndex;
use flowrefine_core::{Graph, NodeId};
use std::collections::HashSet;

/// One directed path from a source tool to a target tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub source: NodeId,
    pub target: NodeId,
    /// Node ids from source to target, inclusive
    pub path: Vec<NodeId>,
}

/// Result of tracing every source/target pair of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineageSet {
    pub lineages: Vec<Lineage>,

    /// Pairs whose paths were cut off at the cap
    pub truncated: Vec<(NodeId, NodeId)>,
}

/// Enumerate simple directed paths from `start` to `end`
///
/// Returns at most `max_paths` paths, in depth-first order over the
/// downstream lists, and an empty list when no path exists.
pub fn find_paths(index: &DependencyIndex, start: NodeId, end: NodeId, max_paths: usize) -> Vec<Vec<NodeId>> {
    let mut paths = Vec::new();
    if max_paths == 0 {
        return paths;
    }
    if start == end {
        paths.push(vec![start]);
        return paths;
    }

    let mut path = vec![start];
    let mut on_path: HashSet<NodeId> = HashSet::from([start]);
    // Next downstream index to try, one entry per path element
    let mut cursors: Vec<usize> = vec![0];

    while let Some(&current) = path.last() {
        if paths.len() >= max_paths {
            break;
        }

        let depth = path.len() - 1;
        let cursor = cursors[depth];

        match index.downstream_of(current).get(cursor) {
            Some(&next) => {
                cursors[depth] += 1;
                if on_path.contains(&next) {
                    continue;
                }
                if next == end {
                    let mut found = path.clone();
                    found.push(next);
                    paths.push(found);
                    continue;
                }
                path.push(next);
                on_path.insert(next);
                cursors.push(0);
            }
            None => {
                on_path.remove(&current);
                path.pop();
                cursors.pop();
            }
        }
    }

    paths
}

/// Traces lineage between every source and target of a graph
pub struct LineageTracer<'a> {
    graph: &'a Graph,
    index: &'a DependencyIndex,
    max_paths: usize,
}

impl<'a> LineageTracer<'a> {
    /// Default cap of ten paths per source/target pair
    pub const DEFAULT_MAX_PATHS: usize = 10;

    pub fn new(graph: &'a Graph, index: &'a DependencyIndex) -> Self {
        Self {
            graph,
            index,
            max_paths: Self::DEFAULT_MAX_PATHS,
        }
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    /// Trace all (source, target) pairs
    pub fn trace(&self) -> LineageSet {
        let mut set = LineageSet::default();

        for source in self.graph.sources() {
            for target in self.graph.targets() {
                // One extra path tells us whether the cap cut anything off
                let mut paths = find_paths(self.index, source.id, target.id, self.max_paths.saturating_add(1));
                if paths.len() > self.max_paths {
                    paths.truncate(self.max_paths);
                    tracing::debug!(
                        source = source.id,
                        target = target.id,
                        cap = self.max_paths,
                        "lineage paths truncated"
                    );
                    set.truncated.push((source.id, target.id));
                }

                set.lineages.extend(paths.into_iter().map(|path| Lineage {
                    source: source.id,
                    target: target.id,
                    path,
                }));
            }
        }

        set
    }
}
