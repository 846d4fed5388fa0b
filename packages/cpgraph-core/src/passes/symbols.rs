//! Symbol resolution pass
//!
//! Binds references to declarations and calls to their overload targets,
//! component-wide. Runs single-threaded at the component tier because
//! resolution may synthesize inferred declarations into a unit's global
//! scope. Declared type names are interned into the run context's type
//! registry as a side effect.

use tracing::debug;

use super::{Pass, PassDescriptor, PassGranularity};
use crate::context::TranslationContext;
use crate::graph::{AstRole, Component, NodeId, NodeKind, TranslationUnit};
use crate::resolution::{resolve_call, resolve_reference};
use crate::shared::models::Result;

pub(crate) static DESCRIPTOR: PassDescriptor = {
    let mut d = PassDescriptor::new("symbol-resolver", PassGranularity::Component);
    d.soft_depends_on = &["evaluation-order"];
    d
};

pub struct SymbolResolverPass;

impl Pass for SymbolResolverPass {
    fn descriptor(&self) -> &'static PassDescriptor {
        &DESCRIPTOR
    }

    fn run_on_component(&self, component: &mut Component, ctx: &TranslationContext) -> Result<()> {
        for unit in component.units.iter_mut() {
            resolve_unit(unit, ctx);
        }
        Ok(())
    }
}

fn resolve_unit(unit: &mut TranslationUnit, ctx: &TranslationContext) {
    let mut references = Vec::new();
    let mut calls = Vec::new();
    for node in unit.graph.iter() {
        match node.kind {
            NodeKind::Reference => references.push(node.id),
            NodeKind::Call => calls.push(node.id),
            _ => {}
        }
        if let Some(t) = &node.type_name {
            ctx.types.intern(t);
        }
    }

    let infer = ctx.config.infer_missing_declarations;
    let mut inferred = 0usize;
    for reference in references {
        let scope = unit.scopes.enclosing_scope(reference, &unit.graph);
        if resolve_reference(unit, reference, scope).is_none() && infer {
            let target = infer_variable(unit, reference);
            unit.graph.node_mut(reference).refers_to = Some(target);
            unit.graph.node_mut(reference).unresolved = false;
            inferred += 1;
        }
    }
    for call in calls {
        let scope = unit.scopes.enclosing_scope(call, &unit.graph);
        let resolution = resolve_call(unit, call, scope, infer);
        if resolution.inferred {
            inferred += 1;
        }
    }
    debug!(unit = %unit.name, inferred, "symbols resolved");
}

/// Synthesize a variable declaration for a dangling reference; it lands
/// in the global scope under the unit root.
fn infer_variable(unit: &mut TranslationUnit, reference: NodeId) -> NodeId {
    let name = unit.graph.node(reference).name.clone();
    let variable = unit.graph.new_node(NodeKind::Variable, name.clone());
    unit.graph.node_mut(variable).inferred = true;
    let root = unit.root;
    let _ = unit.graph.add_ast_child(root, variable, AstRole::Child);
    let global = unit.scopes.global_scope();
    unit.scopes
        .add_declaration_in(global, &name, variable, &unit.graph);
    variable
}
