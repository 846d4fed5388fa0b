//! Call and overload resolution with inference
//!
//! Given a call's name and actual-argument list, gather all reachable
//! candidate declarations and check signature compatibility: positional
//! binding, named-argument binding, defaulted parameters, one variadic
//! positional capture and one variadic keyword capture. Exactly one match
//! binds; several equally-good matches are all recorded as ambiguous; no
//! match synthesizes an inferred declaration mirroring the call (unless
//! inference is disabled, which leaves the call flagged unresolved).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{AstRole, CodeGraph, Diagnostic, NodeId, NodeKind, TranslationUnit};
use crate::scopes::ScopeId;

/// One actual→formal pair produced by signature binding. Consumed by the
/// DFG pass to create argument→parameter flow edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentBinding {
    pub argument: NodeId,
    pub parameter: NodeId,
}

/// Outcome of resolving one call expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallResolution {
    /// Resolution targets; more than one entry means the call is ambiguous
    pub invokes: Vec<NodeId>,
    pub ambiguous: bool,
    /// The target was synthesized because no candidate matched
    pub inferred: bool,
    /// Inference was disabled and no candidate matched
    pub unresolved: bool,
    /// Bindings of the best candidate (first invoke)
    pub bindings: Vec<ArgumentBinding>,
}

/// Parameter shape extracted from a function declaration.
#[derive(Debug, Clone)]
struct Formal {
    id: NodeId,
    name: String,
    type_name: Option<String>,
    has_default: bool,
    is_variadic: bool,
    is_kwargs: bool,
}

fn formals_of(graph: &CodeGraph, function: NodeId) -> Vec<Formal> {
    graph
        .children_with_role(function, &AstRole::Parameter)
        .into_iter()
        .map(|p| {
            let node = graph.node(p);
            let (has_default, is_variadic, is_kwargs) = match node.kind {
                NodeKind::Parameter {
                    has_default,
                    is_variadic,
                    is_kwargs,
                } => (has_default, is_variadic, is_kwargs),
                _ => (false, false, false),
            };
            Formal {
                id: p,
                name: node.name.clone(),
                type_name: node.type_name.clone(),
                has_default,
                is_variadic,
                is_kwargs,
            }
        })
        .collect()
}

/// Best-effort type of an actual argument. Literals fall back to their
/// JSON shape when the frontend set no declared type.
fn actual_type(graph: &CodeGraph, arg: NodeId) -> Option<String> {
    let node = graph.node(arg);
    if let Some(t) = &node.type_name {
        return Some(t.clone());
    }
    match &node.kind {
        NodeKind::Literal { value } => match value {
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some("int".into()),
            serde_json::Value::Number(_) => Some("float".into()),
            serde_json::Value::String(_) => Some("String".into()),
            serde_json::Value::Bool(_) => Some("bool".into()),
            _ => None,
        },
        NodeKind::CollectionLiteral => Some("list".into()),
        _ => None,
    }
}

fn types_compatible(actual: &Option<String>, formal: &Option<String>) -> bool {
    match (actual, formal) {
        (Some(a), Some(f)) => a == f,
        // unknown on either side is treated as compatible
        _ => true,
    }
}

/// Try to bind the call's actuals against one candidate's formals.
/// Returns the argument→parameter pairs on success.
fn try_bind(
    graph: &CodeGraph,
    formals: &[Formal],
    args: &[(NodeId, Option<String>)],
) -> Option<Vec<ArgumentBinding>> {
    let variadic = formals.iter().find(|f| f.is_variadic);
    let kwargs = formals.iter().find(|f| f.is_kwargs);
    let plain: Vec<&Formal> = formals
        .iter()
        .filter(|f| !f.is_variadic && !f.is_kwargs)
        .collect();

    let mut bindings = Vec::new();
    let mut bound: Vec<NodeId> = Vec::new();

    // positional actuals fill plain formals left to right; overflow goes
    // to the single variadic capture if present
    let positional: Vec<NodeId> = args
        .iter()
        .filter(|(_, name)| name.is_none())
        .map(|(a, _)| *a)
        .collect();
    for (i, arg) in positional.iter().enumerate() {
        if let Some(formal) = plain.get(i) {
            if !types_compatible(&actual_type(graph, *arg), &formal.type_name) {
                return None;
            }
            bindings.push(ArgumentBinding {
                argument: *arg,
                parameter: formal.id,
            });
            bound.push(formal.id);
        } else if let Some(v) = variadic {
            // a single *args-like capture absorbs all remaining positionals
            bindings.push(ArgumentBinding {
                argument: *arg,
                parameter: v.id,
            });
        } else {
            return None;
        }
    }

    // named actuals bind by parameter name; leftovers go to **kwargs
    for (arg, name) in args.iter().filter(|(_, name)| name.is_some()) {
        let name = name.as_deref().unwrap_or_default();
        match plain.iter().find(|f| f.name == name) {
            Some(formal) if !bound.contains(&formal.id) => {
                if !types_compatible(&actual_type(graph, *arg), &formal.type_name) {
                    return None;
                }
                bindings.push(ArgumentBinding {
                    argument: *arg,
                    parameter: formal.id,
                });
                bound.push(formal.id);
            }
            _ => {
                let k = kwargs?;
                bindings.push(ArgumentBinding {
                    argument: *arg,
                    parameter: k.id,
                });
            }
        }
    }

    // every unbound plain formal must carry a default
    for formal in &plain {
        if !bound.contains(&formal.id) && !formal.has_default {
            return None;
        }
    }

    Some(bindings)
}

/// Re-derive the argument→parameter bindings of an already-resolved call.
/// Used by the data-flow pass, which runs after resolution and only has
/// the `invokes` targets recorded on the call node.
pub fn bind_call(graph: &CodeGraph, call: NodeId, function: NodeId) -> Vec<ArgumentBinding> {
    let args = graph.call_arguments(call);
    let formals = formals_of(graph, function);
    try_bind(graph, &formals, &args).unwrap_or_default()
}

/// Resolve one call against the overload set reachable from `from_scope`.
///
/// On zero matches an inferred declaration whose signature mirrors the
/// call is synthesized into the global scope, unless `infer_missing` is
/// false, in which case the call is flagged unresolved and a diagnostic is
/// recorded.
pub fn resolve_call(
    unit: &mut TranslationUnit,
    call: NodeId,
    from_scope: ScopeId,
    infer_missing: bool,
) -> CallResolution {
    let callee = unit.graph.node(call).name.clone();
    let args = unit.graph.call_arguments(call);

    let candidates: Vec<NodeId> = unit
        .scopes
        .lookup_symbol(&callee, from_scope, &unit.graph)
        .into_iter()
        .filter(|d| unit.graph.node(*d).kind.is_callable())
        .collect();

    let mut matches: Vec<(NodeId, Vec<ArgumentBinding>)> = Vec::new();
    for candidate in &candidates {
        let formals = formals_of(&unit.graph, *candidate);
        if let Some(bindings) = try_bind(&unit.graph, &formals, &args) {
            matches.push((*candidate, bindings));
        }
    }

    let resolution = match matches.len() {
        1 => {
            let (target, bindings) = matches.remove(0);
            CallResolution {
                invokes: vec![target],
                bindings,
                ..Default::default()
            }
        }
        0 => {
            if infer_missing {
                let inferred = infer_function(unit, &callee, &args);
                debug!(callee, target = %inferred, "inferred missing function declaration");
                let formals = formals_of(&unit.graph, inferred);
                let bindings = try_bind(&unit.graph, &formals, &args)
                    .unwrap_or_default();
                CallResolution {
                    invokes: vec![inferred],
                    inferred: true,
                    bindings,
                    ..Default::default()
                }
            } else {
                unit.diagnostics.push(Diagnostic {
                    message: format!("call to '{callee}' could not be resolved"),
                    location: unit.graph.node(call).location.clone(),
                    node: Some(call),
                });
                CallResolution {
                    unresolved: true,
                    ..Default::default()
                }
            }
        }
        _ => {
            let bindings = matches[0].1.clone();
            CallResolution {
                invokes: matches.into_iter().map(|(t, _)| t).collect(),
                ambiguous: true,
                bindings,
                ..Default::default()
            }
        }
    };

    // record results on the call node so downstream passes see them
    {
        let node = unit.graph.node_mut(call);
        node.invokes = resolution.invokes.clone();
        node.unresolved = resolution.unresolved;
    }
    resolution
}

/// Synthesize a function declaration whose signature mirrors the call.
/// The new declaration lands in the global scope and is marked inferred.
fn infer_function(
    unit: &mut TranslationUnit,
    name: &str,
    args: &[(NodeId, Option<String>)],
) -> NodeId {
    let function = unit.graph.new_node(NodeKind::Function, name);
    unit.graph.node_mut(function).inferred = true;
    // inferred declarations hang off the unit root so they stay owned
    let root = unit.root;
    let _ = unit.graph.add_ast_child(root, function, AstRole::Child);

    for (i, (arg, arg_name)) in args.iter().enumerate() {
        let param_name = arg_name
            .clone()
            .unwrap_or_else(|| format!("arg{i}"));
        let param = unit.graph.new_node(
            NodeKind::Parameter {
                has_default: false,
                is_variadic: false,
                is_kwargs: false,
            },
            param_name,
        );
        unit.graph.node_mut(param).inferred = true;
        unit.graph.node_mut(param).type_name = actual_type(&unit.graph, *arg);
        let _ = unit.graph.add_ast_child(function, param, AstRole::Parameter);
    }

    let global = unit.scopes.global_scope();
    unit.scopes
        .add_declaration_in(global, name, function, &unit.graph);
    function
}

/// Resolve a plain reference to its nearest declaration.
pub fn resolve_reference(
    unit: &mut TranslationUnit,
    reference: NodeId,
    from_scope: ScopeId,
) -> Option<NodeId> {
    let name = unit.graph.node(reference).name.clone();
    let found = unit.scopes.lookup_symbol(&name, from_scope, &unit.graph);
    let target = found.first().copied();
    unit.graph.node_mut(reference).refers_to = target;
    if target.is_none() {
        unit.graph.node_mut(reference).unresolved = true;
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::scopes::ScopeKind;

    fn unit_with_overloads(signatures: &[&[Option<&str>]]) -> TranslationUnit {
        // each entry: parameter type names (None = untyped)
        let mut b = GraphBuilder::new("test.py", "python");
        let root = b.root();
        for params in signatures {
            let f = b
                .new_declaration(NodeKind::Function, "foo", root, AstRole::Child)
                .unwrap();
            b.enter_scope(ScopeKind::Function, f);
            for (i, ty) in params.iter().enumerate() {
                let p = b
                    .new_declaration(
                        NodeKind::Parameter {
                            has_default: false,
                            is_variadic: false,
                            is_kwargs: false,
                        },
                        format!("p{i}"),
                        f,
                        AstRole::Parameter,
                    )
                    .unwrap();
                if let Some(ty) = ty {
                    b.set_type(p, *ty);
                }
            }
            b.leave_scope().unwrap();
        }
        b.finish()
    }

    fn add_call(unit: &mut TranslationUnit, args: &[(i64, Option<&str>)]) -> NodeId {
        let root = unit.root;
        let call = unit.graph.new_node(NodeKind::Call, "foo");
        unit.graph.add_ast_child(root, call, AstRole::Child).unwrap();
        for (v, name) in args {
            let lit = unit.graph.new_node(
                NodeKind::Literal {
                    value: serde_json::json!(v),
                },
                "",
            );
            unit.graph
                .add_ast_child(
                    call,
                    lit,
                    AstRole::Argument {
                        name: name.map(str::to_string),
                    },
                )
                .unwrap();
        }
        call
    }

    #[test]
    fn test_exact_match_binds() {
        let mut unit = unit_with_overloads(&[&[Some("int"), Some("int")]]);
        let call = add_call(&mut unit, &[(1, None), (2, None)]);
        let global = unit.scopes.global_scope();
        let res = resolve_call(&mut unit, call, global, true);
        assert_eq!(res.invokes.len(), 1);
        assert!(!res.inferred);
        assert_eq!(res.bindings.len(), 2);
    }

    #[test]
    fn test_no_match_infers_mirrored_signature() {
        // overloads foo(), foo(int,int), foo(int,String): none fits foo(1,2,3)
        let mut unit = unit_with_overloads(&[
            &[],
            &[Some("int"), Some("int")],
            &[Some("int"), Some("String")],
        ]);
        let call = add_call(&mut unit, &[(1, None), (2, None), (3, None)]);
        let global = unit.scopes.global_scope();
        let res = resolve_call(&mut unit, call, global, true);

        assert!(res.inferred);
        assert_eq!(res.invokes.len(), 1);
        let target = res.invokes[0];
        assert!(unit.graph.node(target).inferred);
        let params = unit.graph.children_with_role(target, &AstRole::Parameter);
        assert_eq!(params.len(), 3);
        for p in params {
            assert_eq!(unit.graph.node(p).type_name.as_deref(), Some("int"));
        }
        // the call's resolved target set is exactly the inferred declaration
        assert_eq!(unit.graph.node(call).invokes, vec![target]);
    }

    #[test]
    fn test_inference_disabled_flags_unresolved() {
        let mut unit = unit_with_overloads(&[&[]]);
        let call = add_call(&mut unit, &[(1, None)]);
        let global = unit.scopes.global_scope();
        let res = resolve_call(&mut unit, call, global, false);
        assert!(res.unresolved);
        assert!(res.invokes.is_empty());
        assert!(unit.graph.node(call).unresolved);
        assert_eq!(unit.diagnostics.len(), 1);
    }

    #[test]
    fn test_ambiguous_records_all_candidates() {
        // two untyped unary overloads are equally compatible
        let mut unit = unit_with_overloads(&[&[None], &[None]]);
        let call = add_call(&mut unit, &[(1, None)]);
        let global = unit.scopes.global_scope();
        let res = resolve_call(&mut unit, call, global, true);
        assert!(res.ambiguous);
        assert_eq!(res.invokes.len(), 2);
    }

    #[test]
    fn test_named_and_default_binding() {
        let mut b = GraphBuilder::new("test.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "foo", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        b.new_declaration(
            NodeKind::Parameter {
                has_default: false,
                is_variadic: false,
                is_kwargs: false,
            },
            "a",
            f,
            AstRole::Parameter,
        )
        .unwrap();
        b.new_declaration(
            NodeKind::Parameter {
                has_default: true,
                is_variadic: false,
                is_kwargs: false,
            },
            "b",
            f,
            AstRole::Parameter,
        )
        .unwrap();
        b.leave_scope().unwrap();
        let mut unit = b.finish();

        // foo(b=2) is missing required 'a' → no match → inferred
        let call1 = add_call(&mut unit, &[(2, Some("b"))]);
        let global = unit.scopes.global_scope();
        let res1 = resolve_call(&mut unit, call1, global, false);
        assert!(res1.unresolved);

        // foo(1) leaves defaulted 'b' unsupplied → matches
        let call2 = add_call(&mut unit, &[(1, None)]);
        let res2 = resolve_call(&mut unit, call2, global, true);
        assert_eq!(res2.invokes, vec![f]);
        assert_eq!(res2.bindings.len(), 1);

        // foo(1, b=2) binds both
        let call3 = add_call(&mut unit, &[(1, None), (2, Some("b"))]);
        let res3 = resolve_call(&mut unit, call3, global, true);
        assert_eq!(res3.invokes, vec![f]);
        assert_eq!(res3.bindings.len(), 2);
    }

    #[test]
    fn test_variadic_captures_remaining_positionals() {
        let mut b = GraphBuilder::new("test.py", "python");
        let root = b.root();
        let f = b
            .new_declaration(NodeKind::Function, "foo", root, AstRole::Child)
            .unwrap();
        b.enter_scope(ScopeKind::Function, f);
        b.new_declaration(
            NodeKind::Parameter {
                has_default: false,
                is_variadic: false,
                is_kwargs: false,
            },
            "first",
            f,
            AstRole::Parameter,
        )
        .unwrap();
        let rest = b
            .new_declaration(
                NodeKind::Parameter {
                    has_default: false,
                    is_variadic: true,
                    is_kwargs: false,
                },
                "rest",
                f,
                AstRole::Parameter,
            )
            .unwrap();
        let kw = b
            .new_declaration(
                NodeKind::Parameter {
                    has_default: false,
                    is_variadic: false,
                    is_kwargs: true,
                },
                "kw",
                f,
                AstRole::Parameter,
            )
            .unwrap();
        b.leave_scope().unwrap();
        let mut unit = b.finish();

        let call = add_call(
            &mut unit,
            &[(1, None), (2, None), (3, None), (4, Some("extra"))],
        );
        let global = unit.scopes.global_scope();
        let res = resolve_call(&mut unit, call, global, true);
        assert_eq!(res.invokes, vec![f]);

        // two unmatched positionals split across the single variadic capture
        let to_rest = res.bindings.iter().filter(|b| b.parameter == rest).count();
        assert_eq!(to_rest, 2);
        // the unmatched named actual lands in **kwargs
        let to_kw = res.bindings.iter().filter(|b| b.parameter == kw).count();
        assert_eq!(to_kw, 1);
    }
}
