//! Node model
//!
//! Nodes form one arena-backed AST ownership tree per translation unit,
//! with EOG/DFG/CDG and overlay layers as index-referenced overlays on
//! top. The node kind is a closed tagged-variant set per concern
//! (declaration / statement / expression) with narrow capability queries
//! instead of a deep type hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::edges::{AstEdge, CdgEdge, DfgEdge, EogEdge};
use crate::shared::models::Location;

/// Stable node identifier: index into the owning unit's node arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Closed set of node kinds across all supported languages.
///
/// Frontends only emit these; passes match on them exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // --- declarations ---
    TranslationUnit,
    Namespace,
    Record,
    Function,
    Parameter {
        has_default: bool,
        is_variadic: bool,
        is_kwargs: bool,
    },
    Variable,

    // --- statements ---
    Block,
    DeclarationStatement,
    If,
    Switch,
    Case {
        is_default: bool,
    },
    While,
    DoWhile,
    For,
    ForEach,
    Return,
    Break,
    Continue,
    Try,
    Catch,
    Throw,
    Empty,

    // --- expressions ---
    Call,
    Reference,
    Literal {
        value: serde_json::Value,
    },
    CollectionLiteral,
    BinaryOperator {
        op: String,
    },
    UnaryOperator {
        op: String,
    },
    Assign,
    MemberAccess,
    Conditional,

    /// Placeholder emitted when a frontend keeps a best-effort partial AST
    Problem {
        description: String,
    },
}

impl NodeKind {
    /// Declarations are resolution targets for references and calls.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::TranslationUnit
                | NodeKind::Namespace
                | NodeKind::Record
                | NodeKind::Function
                | NodeKind::Parameter { .. }
                | NodeKind::Variable
        )
    }

    /// Callable declarations accumulate into overload sets.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Function)
    }

    /// Nodes that fork the EOG into multiple conditional successors.
    pub fn is_branching(&self) -> bool {
        match self {
            NodeKind::If
            | NodeKind::Switch
            | NodeKind::While
            | NodeKind::DoWhile
            | NodeKind::For
            | NodeKind::ForEach
            | NodeKind::Conditional => true,
            NodeKind::BinaryOperator { op } => op == "&&" || op == "||",
            _ => false,
        }
    }

    /// Loop heads are the widening points of the interval evaluator.
    pub fn is_loop_head(&self) -> bool {
        matches!(
            self,
            NodeKind::While | NodeKind::DoWhile | NodeKind::For | NodeKind::ForEach
        )
    }

    /// Nodes carrying a base expression (for Partial DFG granularity).
    pub fn has_base(&self) -> bool {
        matches!(self, NodeKind::MemberAccess)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::TranslationUnit => "TranslationUnit",
            NodeKind::Namespace => "Namespace",
            NodeKind::Record => "Record",
            NodeKind::Function => "Function",
            NodeKind::Parameter { .. } => "Parameter",
            NodeKind::Variable => "Variable",
            NodeKind::Block => "Block",
            NodeKind::DeclarationStatement => "DeclarationStatement",
            NodeKind::If => "If",
            NodeKind::Switch => "Switch",
            NodeKind::Case { .. } => "Case",
            NodeKind::While => "While",
            NodeKind::DoWhile => "DoWhile",
            NodeKind::For => "For",
            NodeKind::ForEach => "ForEach",
            NodeKind::Return => "Return",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Try => "Try",
            NodeKind::Catch => "Catch",
            NodeKind::Throw => "Throw",
            NodeKind::Empty => "Empty",
            NodeKind::Call => "Call",
            NodeKind::Reference => "Reference",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::CollectionLiteral => "CollectionLiteral",
            NodeKind::BinaryOperator { .. } => "BinaryOperator",
            NodeKind::UnaryOperator { .. } => "UnaryOperator",
            NodeKind::Assign => "Assign",
            NodeKind::MemberAccess => "MemberAccess",
            NodeKind::Conditional => "Conditional",
            NodeKind::Problem { .. } => "Problem",
        }
    }
}

/// A node in the code property graph.
///
/// Identity equality is `NodeId` comparison; structural equality (ignoring
/// ids) lives on [`crate::graph::CodeGraph::structurally_equal`] and is
/// meant for test/verification tooling only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Simple name (empty for anonymous nodes)
    pub name: String,
    /// Fully qualified name assembled from the scope chain
    pub qualified_name: String,
    pub location: Option<Location>,
    /// Original source text, if the frontend kept it
    pub code: Option<String>,
    /// Declared type name, if known
    pub type_name: Option<String>,
    /// Synthesized by inference rather than emitted by a frontend
    pub inferred: bool,
    /// Reference/call left dangling because inference was disabled
    pub unresolved: bool,

    // AST ownership layer
    pub ast_parent: Option<NodeId>,
    pub ast_children: Vec<AstEdge>,

    // Evaluation order layer (may cycle)
    pub next_eog: Vec<EogEdge>,
    pub prev_eog: Vec<EogEdge>,

    // Data flow layer
    pub next_dfg: Vec<DfgEdge>,
    pub prev_dfg: Vec<DfgEdge>,

    // Control dependence layer
    pub next_cdg: Vec<CdgEdge>,
    pub prev_cdg: Vec<CdgEdge>,

    // Overlay layer (reference-only, mirrored, may cycle)
    pub overlays: Vec<NodeId>,
    pub underlying: Option<NodeId>,

    /// Resolved call targets (Call nodes only)
    pub invokes: Vec<NodeId>,
    /// Resolved declaration (Reference nodes only)
    pub refers_to: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            kind,
            qualified_name: name.clone(),
            name,
            location: None,
            code: None,
            type_name: None,
            inferred: false,
            unresolved: false,
            ast_parent: None,
            ast_children: Vec::new(),
            next_eog: Vec::new(),
            prev_eog: Vec::new(),
            next_dfg: Vec::new(),
            prev_dfg: Vec::new(),
            next_cdg: Vec::new(),
            prev_cdg: Vec::new(),
            overlays: Vec::new(),
            underlying: None,
            invokes: Vec::new(),
            refers_to: None,
        }
    }

    /// Ids of AST children in order.
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ast_children.iter().map(|e| e.child)
    }

    /// Ids of EOG successors.
    pub fn eog_successors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.next_eog.iter().map(|e| e.other)
    }

    /// Ids of EOG predecessors.
    pub fn eog_predecessors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.prev_eog.iter().map(|e| e.other)
    }

    /// Ids of nodes this node's value flows into.
    pub fn dfg_successors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.next_dfg.iter().map(|e| e.other)
    }

    /// Ids of nodes whose values flow into this node.
    pub fn dfg_predecessors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.prev_dfg.iter().map(|e| e.other)
    }

    /// A node never attached to the EOG is unreachable code (or not a
    /// statement/expression at all).
    pub fn has_incoming_eog(&self) -> bool {
        !self.prev_eog.is_empty()
    }
}
