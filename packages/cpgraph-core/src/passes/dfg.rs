//! Data flow graph construction
//!
//! Adds value-flow edges on top of the resolved graph: initializers into
//! variables, declarations into reads, writes back into declarations,
//! operands into operators, arguments into the matched parameters of
//! every resolved call target, and returned values out through the
//! function declaration. Member writes flow with Partial granularity so
//! field-sensitive consumers can tell `o.f` from `o`.
//!
//! Only EOG-reachable nodes are considered, so unreachable code never
//! contributes flow.

use rustc_hash::FxHashSet;
use tracing::debug;

use super::{Pass, PassDescriptor, PassGranularity};
use crate::context::TranslationContext;
use crate::graph::{AstRole, CodeGraph, Granularity, NodeId, NodeKind, TranslationUnit};
use crate::resolution::bind_call;
use crate::shared::models::Result;

pub(crate) static DESCRIPTOR: PassDescriptor = {
    let mut d = PassDescriptor::new("data-flow", PassGranularity::Unit);
    d.hard_depends_on = &["evaluation-order", "symbol-resolver"];
    d
};

pub struct DataFlowPass;

impl Pass for DataFlowPass {
    fn descriptor(&self) -> &'static PassDescriptor {
        &DESCRIPTOR
    }

    fn run_on_unit(&self, unit: &mut TranslationUnit, _ctx: &TranslationContext) -> Result<()> {
        let mut reachable: FxHashSet<NodeId> = FxHashSet::default();
        let mut worklist = unit.functions();
        worklist.push(unit.root);
        while let Some(id) = worklist.pop() {
            if reachable.insert(id) {
                worklist.extend(unit.graph.node(id).eog_successors());
            }
        }

        let mut todo: Vec<NodeId> = reachable.iter().copied().collect();
        todo.sort_unstable();
        let mut edges = 0usize;
        for node in todo {
            edges += handle_node(&mut unit.graph, node);
        }
        debug!(unit = %unit.name, edges, "DFG built");
        Ok(())
    }
}

fn handle_node(graph: &mut CodeGraph, node: NodeId) -> usize {
    let before = graph.node(node).next_dfg.len() + graph.node(node).prev_dfg.len();
    match graph.node(node).kind.clone() {
        NodeKind::Variable => {
            if let Some(init) = graph.child_with_role(node, &AstRole::Initializer) {
                graph.add_dfg_edge(init, node, Granularity::Full);
            }
        }
        NodeKind::Reference => {
            if let Some(decl) = graph.node(node).refers_to {
                if is_write_target(graph, node) {
                    graph.add_dfg_edge(node, decl, Granularity::Full);
                } else {
                    graph.add_dfg_edge(decl, node, Granularity::Full);
                }
            }
        }
        NodeKind::Assign => {
            let lhs = graph.child_with_role(node, &AstRole::Lhs);
            let rhs = graph.child_with_role(node, &AstRole::Rhs);
            if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                graph.add_dfg_edge(rhs, lhs, Granularity::Full);
                // writing through a member access updates that member of
                // the base object
                if graph.node(lhs).kind.has_base() {
                    if let Some(base) = graph.child_with_role(lhs, &AstRole::Base) {
                        let member = graph.node(lhs).name.clone();
                        graph.add_dfg_edge(lhs, base, Granularity::Partial { target: member });
                    }
                }
            }
        }
        NodeKind::BinaryOperator { .. } => {
            for role in [AstRole::Lhs, AstRole::Rhs] {
                if let Some(operand) = graph.child_with_role(node, &role) {
                    graph.add_dfg_edge(operand, node, Granularity::Full);
                }
            }
        }
        NodeKind::UnaryOperator { .. } => {
            if let Some(input) = graph.child_with_role(node, &AstRole::Input) {
                graph.add_dfg_edge(input, node, Granularity::Full);
            }
        }
        NodeKind::Conditional => {
            for role in [AstRole::Then, AstRole::Else] {
                if let Some(arm) = graph.child_with_role(node, &role) {
                    graph.add_dfg_edge(arm, node, Granularity::Full);
                }
            }
        }
        NodeKind::CollectionLiteral => {
            for value in graph.children_with_role(node, &AstRole::Value) {
                graph.add_dfg_edge(value, node, Granularity::Full);
            }
        }
        NodeKind::MemberAccess => {
            if !is_write_target(graph, node) {
                if let Some(base) = graph.child_with_role(node, &AstRole::Base) {
                    let member = graph.node(node).name.clone();
                    graph.add_dfg_edge(base, node, Granularity::Partial { target: member });
                }
            }
        }
        NodeKind::Call => {
            for target in graph.node(node).invokes.clone() {
                for binding in bind_call(graph, node, target) {
                    graph.add_dfg_edge(binding.argument, binding.parameter, Granularity::Full);
                }
                // returned values surface at the call site
                graph.add_dfg_edge(target, node, Granularity::Full);
            }
        }
        NodeKind::Return => {
            if let Some(value) = graph.child_with_role(node, &AstRole::Value) {
                graph.add_dfg_edge(value, node, Granularity::Full);
            }
            if let Some(func) = graph.ast_ancestor(node, |n| n.kind.is_callable()) {
                graph.add_dfg_edge(node, func, Granularity::Full);
            }
        }
        _ => {}
    }
    graph.node(node).next_dfg.len() + graph.node(node).prev_dfg.len() - before
}

/// A node is a write target when it sits on the left side of an
/// assignment.
fn is_write_target(graph: &CodeGraph, node: NodeId) -> bool {
    match graph.node(node).ast_parent {
        Some(parent) => {
            matches!(graph.node(parent).kind, NodeKind::Assign)
                && graph.child_with_role(parent, &AstRole::Lhs) == Some(node)
        }
        None => false,
    }
}
