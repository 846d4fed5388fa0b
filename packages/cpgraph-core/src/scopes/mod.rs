//! Nested scopes and symbol tables
//!
//! Scopes form a tree rooted at the global scope. Each scope owns a
//! symbol table mapping simple names to declarations: callables accumulate
//! into overload sets, variables shadow within and across scopes.

mod scope_manager;

pub use scope_manager::ScopeManager;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use rustc_hash::FxHashMap;

/// Identifier of a scope in the [`ScopeManager`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    Namespace,
    Record,
    Function,
    Block,
}

/// A single scope with its symbol table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// AST node this scope is keyed to (None for the global scope)
    pub node: Option<NodeId>,
    pub parent: Option<ScopeId>,
    /// name → declarations; overload set for callables, single (shadowed)
    /// binding for everything else
    pub symbols: FxHashMap<String, Vec<NodeId>>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, kind: ScopeKind, node: Option<NodeId>, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            node,
            parent,
            symbols: FxHashMap::default(),
        }
    }
}
