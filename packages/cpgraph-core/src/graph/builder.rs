//! Frontend builder surface
//!
//! Frontends populate the graph exclusively through this builder: node
//! creation calls plus scope enter/leave triggers. They never touch the
//! EOG/DFG/CDG layers; those are built by passes afterwards.

use tracing::debug;

use super::edges::AstRole;
use super::node::{NodeId, NodeKind};
use super::store::CodeGraph;
use super::unit::{Diagnostic, TranslationUnit};
use crate::scopes::{ScopeKind, ScopeManager};
use crate::shared::models::{Location, Result};

pub struct GraphBuilder {
    unit: TranslationUnit,
}

impl GraphBuilder {
    /// Start a new translation unit. The root TranslationUnit node is
    /// created implicitly.
    pub fn new(name: impl Into<String>, frontend: impl Into<String>) -> Self {
        let name = name.into();
        let mut graph = CodeGraph::new();
        let root = graph.new_node(NodeKind::TranslationUnit, name.clone());
        Self {
            unit: TranslationUnit {
                name,
                frontend: frontend.into(),
                graph,
                scopes: ScopeManager::new(),
                root,
                diagnostics: Vec::new(),
            },
        }
    }

    pub fn root(&self) -> NodeId {
        self.unit.root
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.unit.graph
    }

    pub fn graph_mut(&mut self) -> &mut CodeGraph {
        &mut self.unit.graph
    }

    /// Create a declaration, attach it to `parent` and register it in the
    /// current scope. The qualified name is assembled from the scope
    /// chain at creation time.
    pub fn new_declaration(
        &mut self,
        kind: NodeKind,
        name: impl Into<String>,
        parent: NodeId,
        role: AstRole,
    ) -> Result<NodeId> {
        let name = name.into();
        debug_assert!(kind.is_declaration(), "new_declaration got {}", kind.name());
        let id = self.unit.graph.new_node(kind, name.clone());
        self.qualify(id, &name);
        self.unit.graph.add_ast_child(parent, id, role)?;
        if !name.is_empty() {
            self.unit.scopes.add_declaration(&name, id, &self.unit.graph);
        }
        debug!(node = %id, name, "declaration emitted");
        Ok(id)
    }

    /// Create a statement node under `parent`.
    pub fn new_statement(&mut self, kind: NodeKind, parent: NodeId, role: AstRole) -> Result<NodeId> {
        let id = self.unit.graph.new_node(kind, "");
        self.unit.graph.add_ast_child(parent, id, role)?;
        Ok(id)
    }

    /// Create an expression node under `parent`. `name` carries the
    /// referenced/called/member name where the kind has one.
    pub fn new_expression(
        &mut self,
        kind: NodeKind,
        name: impl Into<String>,
        parent: NodeId,
        role: AstRole,
    ) -> Result<NodeId> {
        let name = name.into();
        let id = self.unit.graph.new_node(kind, name);
        self.unit.graph.add_ast_child(parent, id, role)?;
        Ok(id)
    }

    /// Push a scope keyed to `node` (function/record/block/namespace).
    pub fn enter_scope(&mut self, kind: ScopeKind, node: NodeId) {
        self.unit.scopes.enter_scope(kind, node);
    }

    pub fn leave_scope(&mut self) -> Result<()> {
        self.unit.scopes.leave_scope()?;
        Ok(())
    }

    pub fn set_location(&mut self, node: NodeId, location: Location) {
        self.unit.graph.node_mut(node).location = Some(location);
    }

    pub fn set_type(&mut self, node: NodeId, type_name: impl Into<String>) {
        self.unit.graph.node_mut(node).type_name = Some(type_name.into());
    }

    pub fn set_code(&mut self, node: NodeId, code: impl Into<String>) {
        self.unit.graph.node_mut(node).code = Some(code.into());
    }

    /// Record a best-effort problem node for a construct the frontend
    /// could not translate, keeping a partial AST.
    pub fn problem(
        &mut self,
        description: impl Into<String>,
        parent: NodeId,
        location: Option<Location>,
    ) -> Result<NodeId> {
        let description = description.into();
        let id = self.unit.graph.new_node(
            NodeKind::Problem {
                description: description.clone(),
            },
            "",
        );
        self.unit.graph.add_ast_child(parent, id, AstRole::Child)?;
        self.unit.graph.node_mut(id).location = location.clone();
        self.unit.diagnostics.push(Diagnostic {
            message: description,
            location,
            node: Some(id),
        });
        Ok(id)
    }

    /// Finish the unit. The scope stack must be back at global.
    pub fn finish(self) -> TranslationUnit {
        debug_assert_eq!(
            self.unit.scopes.current_scope(),
            self.unit.scopes.global_scope(),
            "unbalanced enter/leave scope in frontend"
        );
        self.unit
    }

    fn qualify(&mut self, id: NodeId, name: &str) {
        let mut parts = self
            .unit
            .scopes
            .qualified_prefix(self.unit.scopes.current_scope(), &self.unit.graph);
        if !name.is_empty() {
            parts.push(name.to_string());
        }
        self.unit.graph.node_mut(id).qualified_name = parts.join(".");
    }
}
