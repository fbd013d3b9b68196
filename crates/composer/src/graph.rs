//! Evaluation order of foreign columns.
//!
//! Nodes are foreign columns; an edge runs from each condition column to
//! the foreign column that depends on it. Local conditions are roots that
//! the base model resolves before any foreign column is visited, so only
//! foreign conditions constrain the order.
//!
//! The order is built once per generator by peeling: each pass removes
//! every node whose foreign conditions have all been removed already. A
//! pass that removes nothing means the remaining nodes contain a cycle.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{ComposerError, Result};
use crate::value::ColNo;

/// Foreign columns with their conditions, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    order: Vec<(ColNo, Vec<ColNo>)>,
}

impl DependencyGraph {
    /// Order the foreign columns of `parents` (foreign column → conditions).
    pub fn build(parents: &BTreeMap<ColNo, Vec<ColNo>>) -> Result<Self> {
        let mut unresolved: BTreeSet<ColNo> = parents.keys().copied().collect();
        let mut order = Vec::with_capacity(parents.len());

        while !unresolved.is_empty() {
            let ready: Vec<ColNo> = unresolved
                .iter()
                .copied()
                .filter(|col| {
                    parents[col]
                        .iter()
                        .all(|condition| !unresolved.contains(condition))
                })
                .collect();

            if ready.is_empty() {
                return Err(ComposerError::CyclicDependency {
                    columns: cycle_members(parents, &unresolved),
                });
            }

            for col in ready {
                unresolved.remove(&col);
                order.push((col, parents[&col].clone()));
            }
        }

        Ok(Self { order })
    }

    /// `(foreign column, conditions)` pairs; conditions precede dependents.
    pub fn order(&self) -> &[(ColNo, Vec<ColNo>)] {
        &self.order
    }

    /// Foreign columns in evaluation order.
    pub fn columns(&self) -> impl Iterator<Item = ColNo> + '_ {
        self.order.iter().map(|(col, _)| *col)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Columns that sit on a cycle among the `stuck` nodes.
fn cycle_members(parents: &BTreeMap<ColNo, Vec<ColNo>>, stuck: &BTreeSet<ColNo>) -> Vec<ColNo> {
    let mut graph: DiGraph<ColNo, ()> = DiGraph::new();
    let index: BTreeMap<ColNo, NodeIndex> = stuck.iter().map(|&c| (c, graph.add_node(c))).collect();

    for (&child, &to) in &index {
        for condition in &parents[&child] {
            if let Some(&from) = index.get(condition) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut members: Vec<ColNo> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(|ix| graph[ix])
        .collect();
    members.sort_unstable();
    members
}
