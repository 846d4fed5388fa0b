//! Arena-backed graph storage
//!
//! One `CodeGraph` per translation unit owns all nodes of that unit.
//! Cross-layer edges are index references, never owning pointers, so the
//! EOG/DFG layers may cycle freely while the AST layer stays an acyclic,
//! singly-owned tree. Every mirrored edge kind is inserted and removed
//! through a single method that updates both endpoints atomically.

use serde::{Deserialize, Serialize};

use super::edges::{AstEdge, AstRole, CdgEdge, DfgEdge, EogEdge, Granularity};
use super::node::{Node, NodeId, NodeKind};
use crate::shared::models::{CpgError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeGraph {
    nodes: Vec<Node>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new node in the arena.
    pub fn new_node(&mut self, kind: NodeKind, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, kind, name));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn try_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(CpgError::UnknownNode(id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    // ------------------------------------------------------------------
    // AST layer (ownership)
    // ------------------------------------------------------------------

    /// Append `child` to `parent`'s ordered child list.
    ///
    /// Rejects children that already have a parent: each AST node is
    /// exclusively owned.
    pub fn add_ast_child(&mut self, parent: NodeId, child: NodeId, role: AstRole) -> Result<()> {
        let at = self.node(parent).ast_children.len();
        self.insert_ast_child(parent, at, child, role)
    }

    /// Insert `child` at `index` in `parent`'s child list. Subsequent
    /// children shift, so the position metadata (vector index) stays
    /// contiguous.
    pub fn insert_ast_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
        role: AstRole,
    ) -> Result<()> {
        if let Some(existing) = self.node(child).ast_parent {
            return Err(CpgError::OwnershipViolation {
                child: child.0,
                existing_parent: existing.0,
            });
        }
        self.node_mut(child).ast_parent = Some(parent);
        self.node_mut(parent)
            .ast_children
            .insert(index, AstEdge::new(child, role));
        Ok(())
    }

    /// Remove the ownership edge between `parent` and `child`. Both sides
    /// are updated; later children shift down one position.
    pub fn remove_ast_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).ast_children.retain(|e| e.child != child);
        let c = self.node_mut(child);
        if c.ast_parent == Some(parent) {
            c.ast_parent = None;
        }
    }

    /// Current position of `child` under `parent`, if owned by it.
    pub fn ast_position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent)
            .ast_children
            .iter()
            .position(|e| e.child == child)
    }

    /// First child of `parent` playing `role`.
    pub fn child_with_role(&self, parent: NodeId, role: &AstRole) -> Option<NodeId> {
        self.node(parent)
            .ast_children
            .iter()
            .find(|e| &e.role == role)
            .map(|e| e.child)
    }

    /// All children of `parent` playing `role`, in order.
    pub fn children_with_role(&self, parent: NodeId, role: &AstRole) -> Vec<NodeId> {
        self.node(parent)
            .ast_children
            .iter()
            .filter(|e| &e.role == role)
            .map(|e| e.child)
            .collect()
    }

    /// Argument children of a call, with their keyword names.
    pub fn call_arguments(&self, call: NodeId) -> Vec<(NodeId, Option<String>)> {
        self.node(call)
            .ast_children
            .iter()
            .filter_map(|e| match &e.role {
                AstRole::Argument { name } => Some((e.child, name.clone())),
                _ => None,
            })
            .collect()
    }

    /// Walk the AST subtree below `root` (preorder, including `root`).
    pub fn ast_subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for edge in self.node(id).ast_children.iter().rev() {
                stack.push(edge.child);
            }
        }
        out
    }

    /// Nearest AST ancestor (including `node` itself) matching `pred`.
    pub fn ast_ancestor(&self, node: NodeId, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if pred(self.node(id)) {
                return Some(id);
            }
            current = self.node(id).ast_parent;
        }
        None
    }

    // ------------------------------------------------------------------
    // EOG layer (mirrored, may cycle)
    // ------------------------------------------------------------------

    /// Add a directed EOG edge; the mirrored backward edge is inserted on
    /// the target in the same call.
    pub fn add_eog_edge(&mut self, from: NodeId, to: NodeId, branch: Option<bool>) {
        let forward = EogEdge::new(to, branch);
        let backward = EogEdge::new(from, branch);
        self.node_mut(from).next_eog.push(forward);
        self.node_mut(to).prev_eog.push(backward);
    }

    /// Remove an EOG edge; both mirrored halves go away together.
    pub fn remove_eog_edge(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(from).next_eog.retain(|e| e.other != to);
        self.node_mut(to).prev_eog.retain(|e| e.other != from);
    }

    /// Label the `from → to` EOG edge as a loop back-edge with the given
    /// nesting priority. Both mirror copies are relabeled.
    pub fn set_loop_priority(&mut self, from: NodeId, to: NodeId, priority: u32) {
        for e in self.node_mut(from).next_eog.iter_mut() {
            if e.other == to {
                e.loop_priority = Some(priority);
            }
        }
        for e in self.node_mut(to).prev_eog.iter_mut() {
            if e.other == from {
                e.loop_priority = Some(priority);
            }
        }
    }

    // ------------------------------------------------------------------
    // DFG layer (mirrored)
    // ------------------------------------------------------------------

    pub fn add_dfg_edge(&mut self, from: NodeId, to: NodeId, granularity: Granularity) {
        self.node_mut(from).next_dfg.push(DfgEdge {
            other: to,
            granularity: granularity.clone(),
        });
        self.node_mut(to).prev_dfg.push(DfgEdge {
            other: from,
            granularity,
        });
    }

    pub fn remove_dfg_edge(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(from).next_dfg.retain(|e| e.other != to);
        self.node_mut(to).prev_dfg.retain(|e| e.other != from);
    }

    // ------------------------------------------------------------------
    // CDG layer (mirrored)
    // ------------------------------------------------------------------

    pub fn add_cdg_edge(&mut self, from: NodeId, to: NodeId, branches: Vec<bool>) {
        self.node_mut(from).next_cdg.push(CdgEdge::new(to, branches.clone()));
        self.node_mut(to).prev_cdg.push(CdgEdge::new(from, branches));
    }

    // ------------------------------------------------------------------
    // Overlay layer (reference-only, mirrored)
    // ------------------------------------------------------------------

    /// Attach an overlay (semantic tag) node to a base node. The overlay
    /// records its underlying node; the base records the overlay.
    pub fn attach_overlay(&mut self, base: NodeId, overlay: NodeId) -> Result<()> {
        if let Some(existing) = self.node(overlay).underlying {
            if existing != base {
                return Err(CpgError::internal(format!(
                    "overlay {overlay} is already attached to {existing}"
                )));
            }
            return Ok(());
        }
        self.node_mut(overlay).underlying = Some(base);
        self.node_mut(base).overlays.push(overlay);
        Ok(())
    }

    pub fn detach_overlay(&mut self, base: NodeId, overlay: NodeId) {
        self.node_mut(base).overlays.retain(|&o| o != overlay);
        let o = self.node_mut(overlay);
        if o.underlying == Some(base) {
            o.underlying = None;
        }
    }

    // ------------------------------------------------------------------
    // Structural equality (test/verification tooling)
    // ------------------------------------------------------------------

    /// Structural equality ignoring underlying node identity: kind, names
    /// and the role/order structure of the AST subtrees must match. Used
    /// by test tooling only; algorithmic code compares `NodeId`s.
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        structurally_equal(self, a, self, b)
    }
}

/// Cross-graph variant of structural equality.
pub fn structurally_equal(ga: &CodeGraph, a: NodeId, gb: &CodeGraph, b: NodeId) -> bool {
    let na = ga.node(a);
    let nb = gb.node(b);
    if na.kind != nb.kind || na.name != nb.name || na.type_name != nb.type_name {
        return false;
    }
    if na.ast_children.len() != nb.ast_children.len() {
        return false;
    }
    na.ast_children
        .iter()
        .zip(nb.ast_children.iter())
        .all(|(ea, eb)| ea.role == eb.role && structurally_equal(ga, ea.child, gb, eb.child))
}
