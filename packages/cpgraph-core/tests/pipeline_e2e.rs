//! End-to-end pipeline test: a frontend-built unit runs through the full
//! default pass schedule and is then queried like a client would.

use cpgraph_core::passes::cyclomatic_complexity;
use cpgraph_core::scopes::ScopeKind;
use cpgraph_core::{
    analyze, AstRole, Bound, Component, GraphBuilder, IntervalEvaluator, LatticeInterval, NodeId,
    NodeKind, RunBudget, TranslationConfig, TranslationResult,
};

struct Program {
    result: TranslationResult,
    process: NodeId,
    param: NodeId,
    arg: NodeId,
    list: NodeId,
    loop_head: NodeId,
    append: NodeId,
    query: NodeId,
}

/// Builds the equivalent of:
///
/// ```python
/// def process(items):
///     xs = [1, 2]
///     while more():
///         xs.append(items)
///     return xs
///
/// def main():
///     process(7)
/// ```
fn build_program() -> Program {
    let mut b = GraphBuilder::new("app.py", "python");
    let root = b.root();

    let process = b
        .new_declaration(NodeKind::Function, "process", root, AstRole::Child)
        .unwrap();
    b.enter_scope(ScopeKind::Function, process);
    let param = b
        .new_declaration(
            NodeKind::Parameter {
                has_default: false,
                is_variadic: false,
                is_kwargs: false,
            },
            "items",
            process,
            AstRole::Parameter,
        )
        .unwrap();
    let body = b.new_statement(NodeKind::Block, process, AstRole::Body).unwrap();

    let list = b
        .new_declaration(NodeKind::Variable, "xs", body, AstRole::Child)
        .unwrap();
    let init = b
        .new_expression(NodeKind::CollectionLiteral, "", list, AstRole::Initializer)
        .unwrap();
    for v in [1, 2] {
        b.new_expression(
            NodeKind::Literal {
                value: serde_json::json!(v),
            },
            "",
            init,
            AstRole::Value,
        )
        .unwrap();
    }

    let loop_head = b.new_statement(NodeKind::While, body, AstRole::Child).unwrap();
    b.new_expression(NodeKind::Call, "more", loop_head, AstRole::Condition)
        .unwrap();
    let lbody = b.new_statement(NodeKind::Block, loop_head, AstRole::Body).unwrap();
    let append = b
        .new_expression(NodeKind::Call, "append", lbody, AstRole::Child)
        .unwrap();
    b.new_expression(NodeKind::Reference, "xs", append, AstRole::Base)
        .unwrap();
    b.new_expression(
        NodeKind::Reference,
        "items",
        append,
        AstRole::Argument { name: None },
    )
    .unwrap();

    let ret = b.new_statement(NodeKind::Return, body, AstRole::Child).unwrap();
    let query = b
        .new_expression(NodeKind::Reference, "xs", ret, AstRole::Value)
        .unwrap();
    b.leave_scope().unwrap();

    let main = b
        .new_declaration(NodeKind::Function, "main", root, AstRole::Child)
        .unwrap();
    b.enter_scope(ScopeKind::Function, main);
    let mbody = b.new_statement(NodeKind::Block, main, AstRole::Body).unwrap();
    let call = b
        .new_expression(NodeKind::Call, "process", mbody, AstRole::Child)
        .unwrap();
    let arg = b
        .new_expression(
            NodeKind::Literal {
                value: serde_json::json!(7),
            },
            "",
            call,
            AstRole::Argument { name: None },
        )
        .unwrap();
    b.leave_scope().unwrap();

    let mut component = Component::new("app");
    component.units.push(b.finish());
    Program {
        result: TranslationResult {
            components: vec![component],
        },
        process,
        param,
        arg,
        list,
        loop_head,
        append,
        query,
    }
}

#[test]
fn full_pipeline_builds_all_layers() {
    let mut program = build_program();
    analyze(&mut program.result, TranslationConfig::default()).unwrap();
    let unit = &program.result.components[0].units[0];
    let graph = &unit.graph;

    // evaluation order: the loop body cycles back to the head, labeled as
    // a back-edge by the loop pass
    assert!(graph
        .node(program.append)
        .next_eog
        .iter()
        .any(|e| e.other == program.loop_head && e.loop_priority == Some(1)));

    // the call in main resolved to `process`, and its argument flows into
    // the parameter
    assert!(graph
        .node(program.arg)
        .dfg_successors()
        .any(|id| id == program.param));

    // the append is control-dependent on the loop condition
    assert!(graph
        .node(program.loop_head)
        .next_cdg
        .iter()
        .any(|e| e.other == program.append && e.branches == vec![true]));

    // the loop may run any number of times: [2, ∞) at the return
    assert_eq!(
        IntervalEvaluator::evaluate(graph, program.query).unwrap(),
        LatticeInterval::bounded(Bound::Value(2), Bound::Top)
    );
    // right after its declaration the list holds exactly two elements
    assert_eq!(
        IntervalEvaluator::evaluate(graph, program.list).unwrap(),
        LatticeInterval::bounded(Bound::Value(2), Bound::Value(2))
    );

    // `more()` had no declaration; resolution synthesized one
    let inferred: Vec<_> = graph.iter().filter(|n| n.inferred).collect();
    assert!(inferred.iter().any(|n| n.name == "more"));

    assert!(cyclomatic_complexity(graph, program.process) >= 2);
}

#[test]
fn rebuilt_unit_is_structurally_equal() {
    let a = build_program();
    let b = build_program();
    let ga = &a.result.components[0].units[0].graph;
    let gb = &b.result.components[0].units[0].graph;
    assert!(cpgraph_core::graph::structurally_equal(
        ga,
        a.result.components[0].units[0].root,
        gb,
        b.result.components[0].units[0].root,
    ));
}

#[test]
fn node_budget_aborts_the_pipeline() {
    let mut program = build_program();
    let config = TranslationConfig {
        budget: RunBudget {
            max_duration: None,
            max_nodes: Some(3),
        },
        ..Default::default()
    };
    let err = analyze(&mut program.result, config).unwrap_err();
    assert_eq!(err.category(), "budget");
}

#[test]
fn complexity_gate_records_diagnostic() {
    let mut program = build_program();
    let config = TranslationConfig {
        max_cdg_complexity: Some(1),
        ..Default::default()
    };
    analyze(&mut program.result, config).unwrap();
    let unit = &program.result.components[0].units[0];
    assert!(unit
        .diagnostics
        .iter()
        .any(|d| d.message.contains("complexity")));
    assert!(unit.graph.node(program.loop_head).next_cdg.is_empty());
}
