//! Scope manager
//!
//! Tracks the scope tree during a single frontend traversal and serves
//! symbol lookups for the rest of the pipeline. Scopes are entered and
//! left exactly once during translation; afterwards the tree is read-only
//! (shared with later passes behind the tier barrier).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Scope, ScopeId, ScopeKind};
use crate::graph::{CodeGraph, NodeId};
use crate::shared::models::{CpgError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
    /// Stack of currently entered scopes; index 0 is always global
    stack: Vec<ScopeId>,
    /// Scope keyed to each AST node that opened one
    node_scopes: rustc_hash::FxHashMap<NodeId, ScopeId>,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    pub fn new() -> Self {
        let global = Scope::new(ScopeId(0), ScopeKind::Global, None, None);
        Self {
            scopes: vec![global],
            stack: vec![ScopeId(0)],
            node_scopes: rustc_hash::FxHashMap::default(),
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current_scope(&self) -> ScopeId {
        *self.stack.last().unwrap_or(&ScopeId(0))
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Scope opened by the given AST node, if any.
    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// Push a new scope keyed to `node`.
    pub fn enter_scope(&mut self, kind: ScopeKind, node: NodeId) -> ScopeId {
        if let Some(existing) = self.node_scopes.get(&node) {
            // re-entering a scope created earlier in the same traversal
            self.stack.push(*existing);
            return *existing;
        }
        let id = ScopeId(self.scopes.len() as u32);
        let parent = self.current_scope();
        self.scopes.push(Scope::new(id, kind, Some(node), Some(parent)));
        self.node_scopes.insert(node, id);
        self.stack.push(id);
        id
    }

    /// Pop the current scope. The global scope can never be left.
    pub fn leave_scope(&mut self) -> Result<ScopeId> {
        if self.stack.len() <= 1 {
            return Err(CpgError::scope("cannot leave the global scope"));
        }
        Ok(self.stack.pop().expect("stack checked non-empty"))
    }

    /// Insert a declaration into the current scope.
    ///
    /// Callables accumulate under the same simple name (overload set);
    /// anything else shadows a previous same-name binding in this scope.
    pub fn add_declaration(&mut self, name: &str, decl: NodeId, graph: &CodeGraph) {
        self.add_declaration_in(self.current_scope(), name, decl, graph);
    }

    /// Insert a declaration into a specific scope (used by inference to
    /// land synthesized functions in the global scope).
    pub fn add_declaration_in(&mut self, scope: ScopeId, name: &str, decl: NodeId, graph: &CodeGraph) {
        let callable = graph.node(decl).kind.is_callable();
        let entry = self.scopes[scope.index()]
            .symbols
            .entry(name.to_string())
            .or_default();
        if callable {
            entry.push(decl);
        } else {
            // shadowing within the same scope replaces the binding
            entry.clear();
            entry.push(decl);
        }
        debug!(name, ?scope, callable, "declaration added");
    }

    /// Walk outward from `from` to the global scope, collecting bindings.
    ///
    /// For non-callable symbols the nearest binding wins; for callables
    /// the full reachable overload set is returned (nearest scope first).
    pub fn lookup_symbol(&self, name: &str, from: ScopeId, graph: &CodeGraph) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(decls) = scope.symbols.get(name) {
                let all_callable = decls.iter().all(|d| graph.node(*d).kind.is_callable());
                if all_callable {
                    result.extend(decls.iter().copied());
                } else if result.is_empty() {
                    // nearest non-callable binding wins; stop here
                    return decls.clone();
                }
            }
            current = scope.parent;
        }
        result
    }

    /// Lookup starting from the current scope.
    pub fn lookup(&self, name: &str, graph: &CodeGraph) -> Vec<NodeId> {
        self.lookup_symbol(name, self.current_scope(), graph)
    }

    /// The innermost scope enclosing `node`, found by walking AST parents
    /// until a scope-opening node is hit.
    pub fn enclosing_scope(&self, node: NodeId, graph: &CodeGraph) -> ScopeId {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(scope) = self.node_scopes.get(&id) {
                return *scope;
            }
            current = graph.node(id).ast_parent;
        }
        self.global_scope()
    }

    /// Names along the scope chain from global to `scope`, for building
    /// qualified names. Block scopes contribute nothing.
    pub fn qualified_prefix(&self, scope: ScopeId, graph: &CodeGraph) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if !matches!(s.kind, ScopeKind::Global | ScopeKind::Block) {
                if let Some(node) = s.node {
                    let name = &graph.node(node).name;
                    if !name.is_empty() {
                        parts.push(name.clone());
                    }
                }
            }
            current = s.parent;
        }
        parts.reverse();
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    #[test]
    fn test_shadowing_across_scopes() {
        let mut graph = CodeGraph::new();
        let mut scopes = ScopeManager::new();

        let func = graph.new_node(NodeKind::Function, "f");
        let block = graph.new_node(NodeKind::Block, "");
        let x_outer = graph.new_node(NodeKind::Variable, "x");
        let x_inner = graph.new_node(NodeKind::Variable, "x");

        let func_scope = scopes.enter_scope(ScopeKind::Function, func);
        scopes.add_declaration("x", x_outer, &graph);

        let block_scope = scopes.enter_scope(ScopeKind::Block, block);
        scopes.add_declaration("x", x_inner, &graph);

        // reference inside the block resolves to the block declaration
        assert_eq!(scopes.lookup_symbol("x", block_scope, &graph), vec![x_inner]);
        // reference in f outside the block resolves to f's declaration
        assert_eq!(scopes.lookup_symbol("x", func_scope, &graph), vec![x_outer]);

        scopes.leave_scope().unwrap();
        scopes.leave_scope().unwrap();
        assert_eq!(scopes.current_scope(), scopes.global_scope());
    }

    #[test]
    fn test_overload_set_accumulates() {
        let mut graph = CodeGraph::new();
        let mut scopes = ScopeManager::new();

        let f1 = graph.new_node(NodeKind::Function, "foo");
        let f2 = graph.new_node(NodeKind::Function, "foo");
        scopes.add_declaration("foo", f1, &graph);
        scopes.add_declaration("foo", f2, &graph);

        let found = scopes.lookup("foo", &graph);
        assert_eq!(found, vec![f1, f2]);
    }

    #[test]
    fn test_overloads_reachable_across_scopes() {
        let mut graph = CodeGraph::new();
        let mut scopes = ScopeManager::new();

        let outer = graph.new_node(NodeKind::Function, "foo");
        scopes.add_declaration("foo", outer, &graph);

        let record = graph.new_node(NodeKind::Record, "R");
        let record_scope = scopes.enter_scope(ScopeKind::Record, record);
        let inner = graph.new_node(NodeKind::Function, "foo");
        scopes.add_declaration("foo", inner, &graph);

        // the full reachable overload set comes back, nearest first
        let found = scopes.lookup_symbol("foo", record_scope, &graph);
        assert_eq!(found, vec![inner, outer]);
    }

    #[test]
    fn test_cannot_leave_global() {
        let mut scopes = ScopeManager::new();
        assert!(scopes.leave_scope().is_err());
    }

    #[test]
    fn test_variable_shadows_in_same_scope() {
        let mut graph = CodeGraph::new();
        let mut scopes = ScopeManager::new();

        let v1 = graph.new_node(NodeKind::Variable, "x");
        let v2 = graph.new_node(NodeKind::Variable, "x");
        scopes.add_declaration("x", v1, &graph);
        scopes.add_declaration("x", v2, &graph);

        assert_eq!(scopes.lookup("x", &graph), vec![v2]);
    }
}
