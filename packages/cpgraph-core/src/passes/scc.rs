//! Loop detection and labeling
//!
//! Finds strongly connected components of each function's EOG and labels
//! their back-edges with a nesting priority: the outermost loop gets 1,
//! each nested loop one more. Inner loops are found by removing the outer
//! back-edges and decomposing the component again. Also provides the
//! basic-block view of the EOG used for complexity measurement.

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{Pass, PassDescriptor, PassGranularity};
use crate::context::TranslationContext;
use crate::graph::{CodeGraph, NodeId, TranslationUnit};
use crate::shared::models::Result;

pub(crate) static DESCRIPTOR: PassDescriptor = {
    let mut d = PassDescriptor::new("loop-labels", PassGranularity::Unit);
    d.hard_depends_on = &["evaluation-order"];
    d
};

pub struct LoopLabelPass;

impl Pass for LoopLabelPass {
    fn descriptor(&self) -> &'static PassDescriptor {
        &DESCRIPTOR
    }

    fn run_on_unit(&self, unit: &mut TranslationUnit, _ctx: &TranslationContext) -> Result<()> {
        let mut entries = unit.functions();
        entries.push(unit.root);
        for entry in entries {
            let nodes = eog_reachable(&unit.graph, entry);
            let edges: Vec<(NodeId, NodeId)> = nodes
                .iter()
                .flat_map(|&n| {
                    unit.graph
                        .node(n)
                        .eog_successors()
                        .map(move |s| (n, s))
                        .collect::<Vec<_>>()
                })
                .filter(|(_, t)| nodes.contains(t))
                .collect();
            let mut member_vec: Vec<NodeId> = nodes.iter().copied().collect();
            member_vec.sort_unstable();
            label_region(&mut unit.graph, &member_vec, &edges, 1);
        }
        debug!(unit = %unit.name, "loop back-edges labeled");
        Ok(())
    }
}

fn eog_reachable(graph: &CodeGraph, entry: NodeId) -> FxHashSet<NodeId> {
    let mut seen = FxHashSet::default();
    let mut worklist = vec![entry];
    while let Some(id) = worklist.pop() {
        if seen.insert(id) {
            worklist.extend(graph.node(id).eog_successors());
        }
    }
    seen
}

/// Label the back-edges of every cycle in the region, then recurse into
/// each cycle with its back-edges removed to find nested loops.
fn label_region(graph: &mut CodeGraph, nodes: &[NodeId], edges: &[(NodeId, NodeId)], priority: u32) {
    let mut dg: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index: FxHashMap<NodeId, _> = FxHashMap::default();
    for &n in nodes {
        index.insert(n, dg.add_node(n));
    }
    for (from, to) in edges {
        dg.add_edge(index[from], index[to], ());
    }

    for scc in tarjan_scc(&dg) {
        let members: FxHashSet<NodeId> = scc.iter().map(|&i| dg[i]).collect();
        let is_cycle = members.len() > 1
            || edges
                .iter()
                .any(|(f, t)| f == t && members.contains(f));
        if !is_cycle {
            continue;
        }

        let header = pick_header(graph, &members);
        let back: Vec<NodeId> = edges
            .iter()
            .filter(|(f, t)| *t == header && members.contains(f))
            .map(|(f, _)| *f)
            .collect();
        for from in &back {
            graph.set_loop_priority(*from, header, priority);
        }

        let mut inner_nodes: Vec<NodeId> = members.iter().copied().collect();
        inner_nodes.sort_unstable();
        let inner_edges: Vec<(NodeId, NodeId)> = edges
            .iter()
            .filter(|(f, t)| {
                members.contains(f) && members.contains(t) && !(*t == header && back.contains(f))
            })
            .copied()
            .collect();
        label_region(graph, &inner_nodes, &inner_edges, priority + 1);
    }
}

/// The loop header is the member entered from outside the component,
/// preferring dedicated loop-head nodes when several qualify.
fn pick_header(graph: &CodeGraph, members: &FxHashSet<NodeId>) -> NodeId {
    let entered: Vec<NodeId> = members
        .iter()
        .copied()
        .filter(|&m| {
            graph
                .node(m)
                .eog_predecessors()
                .any(|p| !members.contains(&p))
        })
        .collect();
    entered
        .iter()
        .copied()
        .find(|&m| graph.node(m).kind.is_loop_head())
        .or_else(|| entered.iter().copied().min())
        .or_else(|| members.iter().copied().min())
        .unwrap_or(NodeId(0))
}

/// Partition the EOG reachable from `entry` into maximal straight-line
/// basic blocks (classic leader algorithm).
pub fn basic_blocks(graph: &CodeGraph, entry: NodeId) -> Vec<Vec<NodeId>> {
    let reachable = eog_reachable(graph, entry);
    let mut leaders: FxHashSet<NodeId> = FxHashSet::default();
    leaders.insert(entry);
    for &n in &reachable {
        let node = graph.node(n);
        if node.next_eog.len() > 1 {
            leaders.extend(node.eog_successors());
        }
        if node.prev_eog.len() > 1 {
            leaders.insert(n);
        }
    }

    let mut leader_vec: Vec<NodeId> = leaders.iter().copied().filter(|l| reachable.contains(l)).collect();
    leader_vec.sort_unstable();

    let mut blocks = Vec::new();
    for leader in leader_vec {
        let mut block = vec![leader];
        let mut current = leader;
        loop {
            let node = graph.node(current);
            if node.next_eog.len() != 1 {
                break;
            }
            let next = node.next_eog[0].other;
            if leaders.contains(&next) {
                break;
            }
            block.push(next);
            current = next;
        }
        blocks.push(block);
    }
    blocks
}
