//! Abstract interval evaluation over the EOG
//!
//! Answers "how many elements can this collection hold at this point" by
//! walking the evaluation order graph from the collection's declaration
//! to the query node with a worklist. States merge at join points before
//! a node's effect is applied; loop heads widen during the first phase
//! and narrow in a follow-up sweep, so unbounded growth inside a loop
//! settles at an upper bound of Top instead of iterating forever.
//!
//! Node kinds whose effect on the collection cannot be modeled produce a
//! `CannotEvaluate` error, never a silently wrong number.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::interval::{Bound, LatticeInterval};
use crate::graph::{AstRole, CodeGraph, NodeId, NodeKind};
use crate::shared::models::{CpgError, Result};

/// Method names treated as growing the receiver by one element.
const GROW_METHODS: &[&str] = &["append", "add", "push"];
/// Method names treated as shrinking the receiver by one element.
const SHRINK_METHODS: &[&str] = &["remove", "pop"];

const ONE: LatticeInterval = LatticeInterval::Bounded {
    lower: Bound::Value(1),
    upper: Bound::Value(1),
};

pub struct IntervalEvaluator;

impl IntervalEvaluator {
    /// Size interval of the collection `query` refers to, at the point
    /// just before `query` executes.
    pub fn evaluate(graph: &CodeGraph, query: NodeId) -> Result<LatticeInterval> {
        let target = match &graph.node(query).kind {
            NodeKind::Variable => query,
            NodeKind::Reference => graph.node(query).refers_to.ok_or_else(|| {
                CpgError::cannot_evaluate("query reference is unresolved")
            })?,
            other => {
                return Err(CpgError::cannot_evaluate(format!(
                    "query must be a collection variable or reference, got {}",
                    other.name()
                )))
            }
        };
        if !matches!(graph.node(target).kind, NodeKind::Variable) {
            return Err(CpgError::cannot_evaluate(
                "query does not refer to a variable declaration",
            ));
        }

        let mut analysis = Analysis {
            graph,
            target,
            ins: FxHashMap::default(),
            outs: FxHashMap::default(),
            visits: FxHashMap::default(),
        };
        analysis.widening_phase()?;
        analysis.narrowing_phase()?;
        let at_query = if query == target {
            analysis.outs.get(&target).copied()
        } else {
            analysis.ins.get(&query).copied()
        };
        let result = at_query.unwrap_or(LatticeInterval::Bottom);
        debug!(%query, %target, %result, "interval evaluated");
        Ok(result)
    }
}

struct Analysis<'g> {
    graph: &'g CodeGraph,
    target: NodeId,
    /// State reaching each node (before its effect)
    ins: FxHashMap<NodeId, LatticeInterval>,
    /// State after each node's effect
    outs: FxHashMap<NodeId, LatticeInterval>,
    /// Visit counts during widening; revisited nodes widen even when they
    /// are not loop heads (cycles whose back-edge targets a body entry)
    visits: FxHashMap<NodeId, u32>,
}

impl<'g> Analysis<'g> {
    fn widening_phase(&mut self) -> Result<()> {
        let init = self.initial_state()?;
        self.ins.insert(self.target, LatticeInterval::Bottom);
        self.outs.insert(self.target, init);

        let mut worklist: Vec<NodeId> =
            self.graph.node(self.target).eog_successors().collect();
        while let Some(node) = worklist.pop() {
            let visits = self.visits.entry(node).or_insert(0);
            *visits += 1;
            let force_widen = *visits > 2;
            let joined = self.joined_input(node);
            let new_in = match self.ins.get(&node) {
                Some(old) if self.graph.node(node).kind.is_loop_head() || force_widen => {
                    old.widen(joined)
                }
                _ => joined,
            };
            if self.ins.get(&node) == Some(&new_in) {
                continue;
            }
            self.ins.insert(node, new_in);
            let out = self.effect(node, new_in)?;
            if self.outs.get(&node) != Some(&out) {
                self.outs.insert(node, out);
                worklist.extend(self.graph.node(node).eog_successors());
            }
        }
        Ok(())
    }

    /// One more sweep replacing widened extremes with the now-stable
    /// operands. Narrowing only moves downward, so a bounded number of
    /// rounds suffices.
    fn narrowing_phase(&mut self) -> Result<()> {
        for _ in 0..8 {
            let mut changed = false;
            let nodes: Vec<NodeId> = self.ins.keys().copied().collect();
            for node in nodes {
                if node == self.target {
                    continue;
                }
                let joined = self.joined_input(node);
                let current = self.ins[&node];
                let new_in = if self.graph.node(node).kind.is_loop_head() {
                    current.narrow(joined)
                } else {
                    joined
                };
                if new_in != current {
                    self.ins.insert(node, new_in);
                    changed = true;
                }
                let out = self.effect(node, new_in)?;
                if self.outs.get(&node) != Some(&out) {
                    self.outs.insert(node, out);
                    changed = true;
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Ok(())
    }

    fn joined_input(&self, node: NodeId) -> LatticeInterval {
        self.graph
            .node(node)
            .eog_predecessors()
            .map(|p| self.outs.get(&p).copied().unwrap_or(LatticeInterval::Bottom))
            .fold(LatticeInterval::Bottom, LatticeInterval::join)
    }

    /// Size of the collection right after its declaration.
    fn initial_state(&self) -> Result<LatticeInterval> {
        match self.graph.child_with_role(self.target, &AstRole::Initializer) {
            Some(init) => match &self.graph.node(init).kind {
                NodeKind::CollectionLiteral => {
                    let n = self
                        .graph
                        .children_with_role(init, &AstRole::Value)
                        .len() as i64;
                    Ok(LatticeInterval::degenerate(n))
                }
                other => Err(CpgError::cannot_evaluate(format!(
                    "collection initialized from {}, not a collection literal",
                    other.name()
                ))),
            },
            // declared without initializer: starts empty
            None => Ok(LatticeInterval::degenerate(0)),
        }
    }

    /// Apply `node`'s effect on the tracked collection to `state`.
    fn effect(&self, node: NodeId, state: LatticeInterval) -> Result<LatticeInterval> {
        match &self.graph.node(node).kind {
            // the declaration re-executes on every visit (it may sit
            // inside a loop), restoring the initializer size rather than
            // forwarding whatever state flowed around the cycle
            NodeKind::Variable if node == self.target => self.initial_state(),
            NodeKind::Call if self.receiver(node) == Some(self.target) => {
                let method = self.graph.node(node).name.as_str();
                if GROW_METHODS.contains(&method) {
                    Ok(state.add(ONE))
                } else if SHRINK_METHODS.contains(&method) {
                    Ok(state.sub(ONE).clamp_non_negative())
                } else if method == "clear" {
                    Ok(LatticeInterval::degenerate(0))
                } else {
                    Err(CpgError::cannot_evaluate(format!(
                        "unknown collection method '{method}'"
                    )))
                }
            }
            NodeKind::Assign => {
                let lhs = self.graph.child_with_role(node, &AstRole::Lhs);
                let writes_target = lhs
                    .map(|l| self.graph.node(l).refers_to == Some(self.target))
                    .unwrap_or(false);
                if !writes_target {
                    return Ok(state);
                }
                match self.graph.child_with_role(node, &AstRole::Rhs) {
                    Some(rhs)
                        if matches!(self.graph.node(rhs).kind, NodeKind::CollectionLiteral) =>
                    {
                        let n = self.graph.children_with_role(rhs, &AstRole::Value).len() as i64;
                        Ok(LatticeInterval::degenerate(n))
                    }
                    _ => Err(CpgError::cannot_evaluate(
                        "collection reassigned from an unmodeled expression",
                    )),
                }
            }
            _ => Ok(state),
        }
    }

    /// Declaration the call's receiver resolves to (for `xs.append(v)`
    /// style calls where the base is a reference or member access).
    fn receiver(&self, call: NodeId) -> Option<NodeId> {
        let base = self.graph.child_with_role(call, &AstRole::Base)?;
        match &self.graph.node(base).kind {
            NodeKind::Reference => self.graph.node(base).refers_to,
            NodeKind::MemberAccess => {
                let inner = self.graph.child_with_role(base, &AstRole::Base)?;
                self.graph.node(inner).refers_to
            }
            _ => None,
        }
    }
}
