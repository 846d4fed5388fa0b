//! Control dependence graph construction
//!
//! A node is control-dependent on a branching node when it is reachable
//! from some, but not all, of that node's EOG successors: the branch
//! outcome decides whether the node executes. Each edge records the
//! branch values under which the dependent node runs.
//!
//! Functions above a configurable cyclomatic complexity are skipped with
//! a diagnostic instead of burning quadratic time on generated code.

use rustc_hash::FxHashSet;
use tracing::debug;

use super::scc::basic_blocks;
use super::{Pass, PassDescriptor, PassGranularity};
use crate::context::TranslationContext;
use crate::graph::{CodeGraph, Diagnostic, NodeId, TranslationUnit};
use crate::shared::models::Result;

pub(crate) static DESCRIPTOR: PassDescriptor = {
    let mut d = PassDescriptor::new("control-dependence", PassGranularity::Unit);
    d.hard_depends_on = &["evaluation-order"];
    d.soft_depends_on = &["loop-labels"];
    d
};

pub struct ControlDependencePass;

impl Pass for ControlDependencePass {
    fn descriptor(&self) -> &'static PassDescriptor {
        &DESCRIPTOR
    }

    fn run_on_unit(&self, unit: &mut TranslationUnit, ctx: &TranslationContext) -> Result<()> {
        let mut entries = unit.functions();
        entries.push(unit.root);
        for entry in entries {
            if let Some(max) = ctx.config.max_cdg_complexity {
                let complexity = cyclomatic_complexity(&unit.graph, entry);
                if complexity > max {
                    let name = unit.graph.node(entry).name.clone();
                    unit.diagnostics.push(Diagnostic {
                        message: format!(
                            "control dependence skipped for '{name}': complexity {complexity} exceeds {max}"
                        ),
                        location: unit.graph.node(entry).location.clone(),
                        node: Some(entry),
                    });
                    continue;
                }
            }
            compute_for_entry(&mut unit.graph, entry);
        }
        debug!(unit = %unit.name, "CDG built");
        Ok(())
    }
}

fn compute_for_entry(graph: &mut CodeGraph, entry: NodeId) {
    let mut region = FxHashSet::default();
    let mut worklist = vec![entry];
    while let Some(id) = worklist.pop() {
        if region.insert(id) {
            worklist.extend(graph.node(id).eog_successors());
        }
    }

    let branch_points: Vec<NodeId> = region
        .iter()
        .copied()
        .filter(|&n| graph.node(n).next_eog.len() > 1)
        .collect();

    for bn in branch_points {
        let successors: Vec<(NodeId, Option<bool>)> = graph
            .node(bn)
            .next_eog
            .iter()
            .map(|e| (e.other, e.branch))
            .collect();
        let reach_sets: Vec<FxHashSet<NodeId>> = successors
            .iter()
            .map(|(succ, _)| reachable_from(graph, *succ))
            .collect();

        let mut candidates: Vec<NodeId> = reach_sets
            .iter()
            .flatten()
            .copied()
            .filter(|&n| n != bn)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        for n in candidates {
            let hit: Vec<usize> = (0..successors.len())
                .filter(|&i| reach_sets[i].contains(&n))
                .collect();
            if hit.len() == successors.len() {
                continue;
            }
            let mut branches: Vec<bool> = hit
                .iter()
                .filter_map(|&i| successors[i].1)
                .collect();
            branches.sort_unstable();
            branches.dedup();
            graph.add_cdg_edge(bn, n, branches);
        }
    }
}

fn reachable_from(graph: &CodeGraph, start: NodeId) -> FxHashSet<NodeId> {
    let mut seen = FxHashSet::default();
    let mut worklist = vec![start];
    while let Some(id) = worklist.pop() {
        if seen.insert(id) {
            worklist.extend(graph.node(id).eog_successors());
        }
    }
    seen
}

/// Cyclomatic complexity over the basic-block view of the EOG
/// (`E - N + 2` for a single connected region).
pub fn cyclomatic_complexity(graph: &CodeGraph, entry: NodeId) -> usize {
    let blocks = basic_blocks(graph, entry);
    if blocks.is_empty() {
        return 1;
    }
    let n = blocks.len();
    let e: usize = blocks
        .iter()
        .map(|b| graph.node(*b.last().unwrap_or(&entry)).next_eog.len())
        .sum();
    (e + 2).saturating_sub(n)
}
