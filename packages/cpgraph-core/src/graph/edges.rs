//! Typed edges for the graph layers
//!
//! Each layer (AST / EOG / DFG / CDG) carries its own edge payload. AST
//! edges are ownership edges and live only in the parent's ordered child
//! list; all other layers are reference-only, mirrored on both endpoints
//! and allowed to form cycles (loop back-edges).

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Role of an AST child relative to its parent.
///
/// Roles drive the EOG builder (which child is the condition, which is the
/// body) and the resolver (which children are arguments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AstRole {
    /// Generic ordered child (block statements, unit declarations)
    Child,
    Condition,
    Then,
    Else,
    Body,
    Initializer,
    Iterable,
    Variable,
    Base,
    /// Call argument, optionally keyword-bound
    Argument { name: Option<String> },
    Parameter,
    Lhs,
    Rhs,
    Input,
    Handler,
    Finally,
    Value,
}

/// Ownership edge from an AST parent to one of its children.
///
/// The child's position is its index in the parent's child vector, so
/// position metadata stays contiguous under arbitrary-index insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstEdge {
    pub child: NodeId,
    pub role: AstRole,
}

impl AstEdge {
    pub fn new(child: NodeId, role: AstRole) -> Self {
        Self { child, role }
    }
}

/// Evaluation-order edge. `branch` distinguishes conditional successors
/// (true/false branch of an if, loop entry vs. exit). `loop_priority` is
/// set only on SCC back-edges and encodes loop nesting depth (outermost
/// loop = 1, increasing inward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EogEdge {
    pub other: NodeId,
    pub branch: Option<bool>,
    pub loop_priority: Option<u32>,
}

impl EogEdge {
    pub fn new(other: NodeId, branch: Option<bool>) -> Self {
        Self {
            other,
            branch,
            loop_priority: None,
        }
    }

    /// True iff this edge was labeled as a loop back-edge by the SCC pass.
    pub fn is_back_edge(&self) -> bool {
        self.loop_priority.is_some()
    }
}

/// How much of a value flows along a DFG edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// The whole value flows
    Full,
    /// Only the named member/element flows (field-sensitive analysis)
    Partial { target: String },
}

/// Data-flow edge from a value-producing node to a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DfgEdge {
    pub other: NodeId,
    pub granularity: Granularity,
}

impl DfgEdge {
    pub fn full(other: NodeId) -> Self {
        Self {
            other,
            granularity: Granularity::Full,
        }
    }

    pub fn partial(other: NodeId, target: impl Into<String>) -> Self {
        Self {
            other,
            granularity: Granularity::Partial {
                target: target.into(),
            },
        }
    }
}

/// Control-dependence edge from a branching node to a dependent node.
/// `branches` records which branch values make the target reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdgEdge {
    pub other: NodeId,
    pub branches: Vec<bool>,
}

impl CdgEdge {
    pub fn new(other: NodeId, branches: Vec<bool>) -> Self {
        Self { other, branches }
    }
}
