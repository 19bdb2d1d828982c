//! Lazy breadth-first traversal over part/whole edges.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use hashbrown::HashSet;

use super::FractalGraph;
use crate::model::{Direction, NodeId};

/// One node yielded by a [`Traversal`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalStep {
    pub node: NodeId,
    /// Hops from the start node.
    pub depth: usize,
    /// Product of edge weights along the path that first reached this node.
    pub reach: f64,
}

/// Breadth-first walk. Each node is yielded at most once, at its shallowest
/// depth; neighbors are expanded in id order so the sequence is deterministic.
///
/// Borrows the graph, so the graph cannot change while a traversal is live.
/// Call [`restart`](Traversal::restart) to walk again from the beginning.
#[derive(Debug, Clone)]
pub struct Traversal<'g> {
    graph: &'g FractalGraph,
    origin: NodeId,
    direction: Direction,
    max_depth: usize,
    frontier: VecDeque<TraversalStep>,
    visited: HashSet<NodeId>,
}

impl<'g> Traversal<'g> {
    pub(crate) fn new(graph: &'g FractalGraph, origin: NodeId, direction: Direction, max_depth: usize) -> Self {
        let mut traversal = Self {
            graph,
            origin,
            direction,
            max_depth,
            frontier: VecDeque::new(),
            visited: HashSet::new(),
        };
        traversal.restart();
        traversal
    }

    pub fn origin(&self) -> &NodeId {
        &self.origin
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Effective depth bound, after clamping.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Rewind to the start node.
    pub fn restart(&mut self) {
        self.frontier.clear();
        self.visited.clear();
        self.visited.insert(self.origin.clone());
        self.frontier.push_back(TraversalStep {
            node: self.origin.clone(),
            depth: 0,
            reach: 1.0,
        });
    }
}

impl Iterator for Traversal<'_> {
    type Item = TraversalStep;

    fn next(&mut self) -> Option<TraversalStep> {
        let step = self.frontier.pop_front()?;
        if step.depth < self.max_depth {
            let graph = self.graph;
            for (next, edge) in graph.neighbors(&step.node, self.direction) {
                if self.visited.insert(next.clone()) {
                    self.frontier.push_back(TraversalStep {
                        node: next.clone(),
                        depth: step.depth + 1,
                        reach: step.reach * edge.weight,
                    });
                }
            }
        }
        Some(step)
    }
}

impl FusedIterator for Traversal<'_> {}
