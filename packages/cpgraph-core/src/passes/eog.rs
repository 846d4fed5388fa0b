//! Evaluation order graph construction
//!
//! Walks each function's AST with a frontier of "current predecessors":
//! every newly attached node receives an edge from each frontier entry,
//! then becomes the sole frontier member. Branching constructs fork the
//! frontier with labeled edges and merge the exits; loops close a cycle
//! back to the loop head. Code after a return/break/continue/throw starts
//! with an empty frontier and therefore never receives an incoming EOG
//! edge; a final cleanup sweep strips the edges between such islands.

use rustc_hash::FxHashSet;
use tracing::debug;

use super::{Pass, PassDescriptor, PassGranularity};
use crate::context::TranslationContext;
use crate::graph::{AstRole, CodeGraph, NodeId, NodeKind, TranslationUnit};
use crate::shared::models::Result;

pub(crate) static DESCRIPTOR: PassDescriptor = {
    let mut d = PassDescriptor::new("evaluation-order", PassGranularity::Unit);
    d.execute_first = true;
    d
};

pub struct EvaluationOrderPass;

impl Pass for EvaluationOrderPass {
    fn descriptor(&self) -> &'static PassDescriptor {
        &DESCRIPTOR
    }

    fn run_on_unit(&self, unit: &mut TranslationUnit, _ctx: &TranslationContext) -> Result<()> {
        let functions = unit.functions();
        for func in &functions {
            if unit.graph.node(*func).inferred {
                continue;
            }
            EogBuilder::new(&mut unit.graph).build(*func);
        }
        // script-style statements directly under the unit root
        EogBuilder::new(&mut unit.graph).build(unit.root);
        let removed = remove_unreachable_eog_edges(unit);
        debug!(unit = %unit.name, functions = functions.len(), removed, "EOG built");
        Ok(())
    }
}

enum Frame {
    Loop {
        breaks: Vec<NodeId>,
        continues: Vec<NodeId>,
    },
    Switch {
        breaks: Vec<NodeId>,
    },
}

/// A frontier entry: the predecessor plus the branch label its outgoing
/// edge will carry.
type Pred = (NodeId, Option<bool>);

struct EogBuilder<'g> {
    graph: &'g mut CodeGraph,
    preds: Vec<Pred>,
    frames: Vec<Frame>,
    catches: Vec<Vec<NodeId>>,
    /// When set, the next attached node is recorded here (do-while entry)
    capture_entry: Option<NodeId>,
    capturing: bool,
}

impl<'g> EogBuilder<'g> {
    fn new(graph: &'g mut CodeGraph) -> Self {
        Self {
            graph,
            preds: Vec::new(),
            frames: Vec::new(),
            catches: Vec::new(),
            capture_entry: None,
            capturing: false,
        }
    }

    /// Build the EOG rooted at `entry` (a function declaration or the
    /// translation unit root).
    fn build(&mut self, entry: NodeId) {
        self.preds = vec![(entry, None)];
        let children: Vec<NodeId> = match self.graph.child_with_role(entry, &AstRole::Body) {
            Some(body) => vec![body],
            None => self.graph.node(entry).child_ids().collect(),
        };
        for child in children {
            self.handle(child);
        }
    }

    /// Connect `node` to every frontier entry and make it the frontier.
    fn attach(&mut self, node: NodeId) {
        for (pred, branch) in std::mem::take(&mut self.preds) {
            self.graph.add_eog_edge(pred, node, branch);
        }
        if self.capturing {
            self.capture_entry = Some(node);
            self.capturing = false;
        }
        self.preds = vec![(node, None)];
    }

    fn handle_role(&mut self, parent: NodeId, role: &AstRole) {
        if let Some(child) = self.graph.child_with_role(parent, role) {
            self.handle(child);
        }
    }

    fn handle(&mut self, node: NodeId) {
        let kind = self.graph.node(node).kind.clone();
        match kind {
            // nested declarations get their own EOG; nothing here
            NodeKind::Function | NodeKind::Record | NodeKind::Namespace | NodeKind::Parameter { .. } => {}
            NodeKind::TranslationUnit => {}

            NodeKind::Block | NodeKind::DeclarationStatement => {
                for child in self.graph.node(node).child_ids().collect::<Vec<_>>() {
                    self.handle(child);
                }
            }
            NodeKind::Variable => {
                self.handle_role(node, &AstRole::Initializer);
                self.attach(node);
            }

            NodeKind::If => self.handle_if(node, &AstRole::Then, &AstRole::Else),
            NodeKind::Conditional => self.handle_if(node, &AstRole::Then, &AstRole::Else),
            NodeKind::While => self.handle_loop(node, &[AstRole::Condition], &[]),
            NodeKind::For => self.handle_for(node),
            NodeKind::ForEach => {
                self.handle_loop(node, &[AstRole::Iterable, AstRole::Variable], &[])
            }
            NodeKind::DoWhile => self.handle_do_while(node),
            NodeKind::Switch => self.handle_switch(node),
            NodeKind::Try => self.handle_try(node),

            NodeKind::Return => {
                self.handle_role(node, &AstRole::Value);
                self.attach(node);
                self.preds.clear();
            }
            NodeKind::Break => {
                self.attach(node);
                self.preds.clear();
                if let Some(frame) = self.frames.last_mut() {
                    match frame {
                        Frame::Loop { breaks, .. } | Frame::Switch { breaks } => breaks.push(node),
                    }
                }
            }
            NodeKind::Continue => {
                self.attach(node);
                self.preds.clear();
                for frame in self.frames.iter_mut().rev() {
                    if let Frame::Loop { continues, .. } = frame {
                        continues.push(node);
                        break;
                    }
                }
            }
            NodeKind::Throw => {
                self.handle_role(node, &AstRole::Value);
                self.attach(node);
                self.preds.clear();
                if let Some(catches) = self.catches.last() {
                    for catch in catches.clone() {
                        self.graph.add_eog_edge(node, catch, None);
                    }
                }
            }

            NodeKind::BinaryOperator { ref op } if op == "&&" || op == "||" => {
                self.handle_short_circuit(node, op == "&&");
            }
            NodeKind::BinaryOperator { .. } => {
                self.handle_role(node, &AstRole::Lhs);
                self.handle_role(node, &AstRole::Rhs);
                self.attach(node);
            }
            NodeKind::Assign => {
                self.handle_role(node, &AstRole::Rhs);
                self.handle_role(node, &AstRole::Lhs);
                self.attach(node);
            }
            NodeKind::UnaryOperator { .. } => {
                self.handle_role(node, &AstRole::Input);
                self.attach(node);
            }
            NodeKind::Call => {
                self.handle_role(node, &AstRole::Base);
                for (arg, _) in self.graph.call_arguments(node) {
                    self.handle(arg);
                }
                self.attach(node);
            }
            NodeKind::MemberAccess => {
                self.handle_role(node, &AstRole::Base);
                self.attach(node);
            }
            NodeKind::CollectionLiteral => {
                for value in self.graph.children_with_role(node, &AstRole::Value) {
                    self.handle(value);
                }
                self.attach(node);
            }

            NodeKind::Reference
            | NodeKind::Literal { .. }
            | NodeKind::Empty
            | NodeKind::Case { .. }
            | NodeKind::Catch
            | NodeKind::Problem { .. } => {
                self.attach(node);
            }
        }
    }

    /// Shared shape for If and Conditional: condition first, then the
    /// node itself as the branch point with labeled successor edges.
    fn handle_if(&mut self, node: NodeId, then_role: &AstRole, else_role: &AstRole) {
        self.handle_role(node, &AstRole::Condition);
        self.attach(node);

        self.preds = vec![(node, Some(true))];
        self.handle_role(node, then_role);
        let mut exits = std::mem::take(&mut self.preds);

        if self.graph.child_with_role(node, else_role).is_some() {
            self.preds = vec![(node, Some(false))];
            self.handle_role(node, else_role);
            exits.append(&mut self.preds);
        } else {
            exits.push((node, Some(false)));
        }
        self.preds = exits;
    }

    /// While/ForEach: evaluate the header roles once, then the loop node
    /// is the branch point; body exits and continues close the cycle.
    fn handle_loop(&mut self, node: NodeId, header: &[AstRole], footer: &[AstRole]) {
        for role in header {
            self.handle_role(node, role);
        }
        self.attach(node);

        self.frames.push(Frame::Loop {
            breaks: Vec::new(),
            continues: Vec::new(),
        });
        self.preds = vec![(node, Some(true))];
        self.handle_role(node, &AstRole::Body);

        let frame = self.frames.pop();
        let (breaks, continues) = match frame {
            Some(Frame::Loop { breaks, continues }) => (breaks, continues),
            _ => (Vec::new(), Vec::new()),
        };
        for c in continues {
            self.preds.push((c, None));
        }
        for role in footer {
            self.handle_role(node, role);
        }
        for (pred, branch) in std::mem::take(&mut self.preds) {
            self.graph.add_eog_edge(pred, node, branch);
        }
        self.preds = vec![(node, Some(false))];
        for b in breaks {
            self.preds.push((b, None));
        }
    }

    fn handle_for(&mut self, node: NodeId) {
        self.handle_role(node, &AstRole::Initializer);
        self.handle_loop(node, &[AstRole::Condition], &[AstRole::Value]);
    }

    /// Do-while runs the body before the first condition check, so the
    /// back-edge goes from the loop node to the body's entry node.
    fn handle_do_while(&mut self, node: NodeId) {
        self.frames.push(Frame::Loop {
            breaks: Vec::new(),
            continues: Vec::new(),
        });
        self.capturing = true;
        self.capture_entry = None;
        self.handle_role(node, &AstRole::Body);
        self.capturing = false;
        self.handle_role(node, &AstRole::Condition);
        self.attach(node);

        let frame = self.frames.pop();
        let (breaks, continues) = match frame {
            Some(Frame::Loop { breaks, continues }) => (breaks, continues),
            _ => (Vec::new(), Vec::new()),
        };
        for c in continues {
            self.graph.add_eog_edge(c, node, None);
        }
        if let Some(entry) = self.capture_entry.take() {
            self.graph.add_eog_edge(node, entry, Some(true));
        }
        self.preds = vec![(node, Some(false))];
        for b in breaks {
            self.preds.push((b, None));
        }
    }

    /// The switch node dispatches to each case; statements between cases
    /// fall through unless a break jumps out. Without a default case the
    /// selector may match nothing, so the switch keeps an exit edge.
    fn handle_switch(&mut self, node: NodeId) {
        self.handle_role(node, &AstRole::Condition);
        self.attach(node);

        self.frames.push(Frame::Switch { breaks: Vec::new() });
        self.preds.clear();
        let mut has_default = false;
        let body_children: Vec<NodeId> = self
            .graph
            .child_with_role(node, &AstRole::Body)
            .map(|b| self.graph.node(b).child_ids().collect())
            .unwrap_or_default();
        for child in body_children {
            if let NodeKind::Case { is_default } = self.graph.node(child).kind {
                has_default |= is_default;
                self.preds.push((node, None));
            }
            self.handle(child);
        }

        let breaks = match self.frames.pop() {
            Some(Frame::Switch { breaks }) => breaks,
            _ => Vec::new(),
        };
        for b in breaks {
            self.preds.push((b, None));
        }
        if !has_default {
            self.preds.push((node, None));
        }
    }

    fn handle_try(&mut self, node: NodeId) {
        let catch_nodes = self.graph.children_with_role(node, &AstRole::Handler);
        self.catches.push(catch_nodes.clone());
        self.handle_role(node, &AstRole::Body);
        self.catches.pop();

        let mut exits = std::mem::take(&mut self.preds);
        for catch in catch_nodes {
            // the catch node receives its incoming edges from throw sites
            self.preds = vec![(catch, None)];
            self.handle_role(catch, &AstRole::Body);
            exits.append(&mut self.preds);
        }
        self.preds = exits;
        self.handle_role(node, &AstRole::Finally);
    }

    /// `a && b`: the operator node branches; `b` is only evaluated on the
    /// true edge, and the false edge shortcuts past it (mirrored for ||).
    fn handle_short_circuit(&mut self, node: NodeId, is_and: bool) {
        self.handle_role(node, &AstRole::Lhs);
        self.attach(node);

        let eval_rhs = is_and;
        self.preds = vec![(node, Some(eval_rhs))];
        self.handle_role(node, &AstRole::Rhs);
        self.preds.push((node, Some(!eval_rhs)));
    }
}

/// Strip EOG edges between nodes no EOG walk from a function entry or the
/// unit root can reach. Afterwards unreachable code has neither incoming
/// nor outgoing EOG edges.
pub(crate) fn remove_unreachable_eog_edges(unit: &mut TranslationUnit) -> usize {
    let mut reachable: FxHashSet<NodeId> = FxHashSet::default();
    let mut worklist: Vec<NodeId> = unit.functions();
    worklist.push(unit.root);
    while let Some(id) = worklist.pop() {
        if !reachable.insert(id) {
            continue;
        }
        worklist.extend(unit.graph.node(id).eog_successors());
    }

    let doomed: Vec<(NodeId, NodeId)> = unit
        .graph
        .iter()
        .filter(|n| !reachable.contains(&n.id))
        .flat_map(|n| n.next_eog.iter().map(move |e| (n.id, e.other)))
        .collect();
    for (from, to) in &doomed {
        unit.graph.remove_eog_edge(*from, *to);
    }
    doomed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TranslationConfig;
    use crate::graph::GraphBuilder;
    use crate::scopes::ScopeKind;

    fn ctx() -> TranslationContext {
        TranslationContext::new(TranslationConfig::default())
    }

    fn run(b: GraphBuilder) -> TranslationUnit {
        let mut unit = b.finish();
        EvaluationOrderPass.run_on_unit(&mut unit, &ctx()).unwrap();
        unit
    }

    fn edge_branch(unit: &TranslationUnit, from: NodeId, to: NodeId) -> Option<bool> {
        unit.graph
            .node(from)
            .next_eog
            .iter()
            .find(|e| e.other == to)
            .and_then(|e| e.branch)
    }

    #[test]
    fn test_if_else_diamond() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let iff = b.new_statement(NodeKind::If, body, AstRole::Child).unwrap();
        let cond = b
            .new_expression(NodeKind::Reference, "c", iff, AstRole::Condition)
            .unwrap();
        let then = b.new_statement(NodeKind::Empty, iff, AstRole::Then).unwrap();
        let els = b.new_statement(NodeKind::Empty, iff, AstRole::Else).unwrap();
        let after = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        // f → cond → if ⇒ branches ⇒ merge at `after`
        assert_eq!(unit.graph.node(cond).eog_predecessors().next(), Some(f));
        assert_eq!(edge_branch(&unit, iff, then), Some(true));
        assert_eq!(edge_branch(&unit, iff, els), Some(false));
        let mut merged: Vec<NodeId> = unit.graph.node(after).eog_predecessors().collect();
        merged.sort();
        assert_eq!(merged, vec![then, els]);
    }

    #[test]
    fn test_while_closes_cycle() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let wh = b.new_statement(NodeKind::While, body, AstRole::Child).unwrap();
        let cond = b
            .new_expression(NodeKind::Reference, "c", wh, AstRole::Condition)
            .unwrap();
        let lbody = b.new_statement(NodeKind::Block, wh, AstRole::Body).unwrap();
        let stmt = b.new_statement(NodeKind::Empty, lbody, AstRole::Child).unwrap();
        let after = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        assert_eq!(edge_branch(&unit, wh, stmt), Some(true));
        assert_eq!(edge_branch(&unit, wh, after), Some(false));
        // body exit loops back to the head
        assert!(unit.graph.node(stmt).eog_successors().any(|s| s == wh));
        assert!(unit.graph.node(cond).eog_successors().any(|s| s == wh));
    }

    #[test]
    fn test_code_after_return_is_unreachable() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let ret = b.new_statement(NodeKind::Return, body, AstRole::Child).unwrap();
        let dead1 = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        let dead2 = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        assert!(unit.graph.node(ret).has_incoming_eog());
        assert!(!unit.graph.node(dead1).has_incoming_eog());
        assert!(!unit.graph.node(dead2).has_incoming_eog());
        // the cleanup also strips edges between dead statements
        assert!(unit.graph.node(dead1).next_eog.is_empty());
    }

    #[test]
    fn test_throw_reaches_catch() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let tr = b.new_statement(NodeKind::Try, body, AstRole::Child).unwrap();
        let tbody = b.new_statement(NodeKind::Block, tr, AstRole::Body).unwrap();
        let throw = b.new_statement(NodeKind::Throw, tbody, AstRole::Child).unwrap();
        let catch = b.new_statement(NodeKind::Catch, tr, AstRole::Handler).unwrap();
        let cbody = b.new_statement(NodeKind::Block, catch, AstRole::Body).unwrap();
        let handler_stmt = b.new_statement(NodeKind::Empty, cbody, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        assert!(unit.graph.node(throw).eog_successors().any(|s| s == catch));
        assert!(unit
            .graph
            .node(handler_stmt)
            .eog_predecessors()
            .any(|p| p == catch));
    }

    #[test]
    fn test_short_circuit_and_branches() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let and = b
            .new_expression(
                NodeKind::BinaryOperator { op: "&&".into() },
                "",
                body,
                AstRole::Child,
            )
            .unwrap();
        let lhs = b.new_expression(NodeKind::Reference, "a", and, AstRole::Lhs).unwrap();
        let rhs = b.new_expression(NodeKind::Reference, "b", and, AstRole::Rhs).unwrap();
        let after = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        assert!(unit.graph.node(lhs).eog_successors().any(|s| s == and));
        assert_eq!(edge_branch(&unit, and, rhs), Some(true));
        assert_eq!(edge_branch(&unit, and, after), Some(false));
        assert!(unit.graph.node(rhs).eog_successors().any(|s| s == after));
    }

    #[test]
    fn test_break_and_continue() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let wh = b.new_statement(NodeKind::While, body, AstRole::Child).unwrap();
        b.new_expression(NodeKind::Reference, "c", wh, AstRole::Condition)
            .unwrap();
        let lbody = b.new_statement(NodeKind::Block, wh, AstRole::Body).unwrap();
        let iff = b.new_statement(NodeKind::If, lbody, AstRole::Child).unwrap();
        b.new_expression(NodeKind::Reference, "d", iff, AstRole::Condition)
            .unwrap();
        let brk = b.new_statement(NodeKind::Break, iff, AstRole::Then).unwrap();
        let cont = b.new_statement(NodeKind::Continue, lbody, AstRole::Child).unwrap();
        let after = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        // break exits the loop, continue re-enters the head
        assert!(unit.graph.node(brk).eog_successors().any(|s| s == after));
        assert!(unit.graph.node(cont).eog_successors().any(|s| s == wh));
    }

    #[test]
    fn test_switch_dispatch_and_fallthrough() {
        let mut b = GraphBuilder::new("t.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "f", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        let body = b.new_statement(NodeKind::Block, f, AstRole::Body).unwrap();
        let sw = b.new_statement(NodeKind::Switch, body, AstRole::Child).unwrap();
        b.new_expression(NodeKind::Reference, "x", sw, AstRole::Condition)
            .unwrap();
        let sbody = b.new_statement(NodeKind::Block, sw, AstRole::Body).unwrap();
        let c1 = b
            .new_statement(NodeKind::Case { is_default: false }, sbody, AstRole::Child)
            .unwrap();
        let s1 = b.new_statement(NodeKind::Empty, sbody, AstRole::Child).unwrap();
        let c2 = b
            .new_statement(NodeKind::Case { is_default: false }, sbody, AstRole::Child)
            .unwrap();
        let s2 = b.new_statement(NodeKind::Empty, sbody, AstRole::Child).unwrap();
        let after = b.new_statement(NodeKind::Empty, body, AstRole::Child).unwrap();
        b.leave_scope().unwrap();
        let unit = run(b);

        // dispatch edges from the switch to both cases
        assert!(unit.graph.node(sw).eog_successors().any(|s| s == c1));
        assert!(unit.graph.node(sw).eog_successors().any(|s| s == c2));
        // fallthrough: s1 flows into case 2
        assert!(unit.graph.node(s1).eog_successors().any(|s| s == c2));
        // no default: the switch itself can fall out
        assert!(unit.graph.node(sw).eog_successors().any(|s| s == after));
        assert!(unit.graph.node(s2).eog_successors().any(|s| s == after));
    }
}
