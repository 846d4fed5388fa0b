//! Translation units, components and the final result
//!
//! A translation unit is the per-file output of a frontend: one node arena
//! plus the scope tree built during traversal. Units group into
//! components (e.g. one per analyzed project), components group into the
//! translation result handed to query/reporting collaborators.

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::store::CodeGraph;
use crate::scopes::ScopeManager;
use crate::shared::models::Location;

/// A recorded, non-fatal problem (parse issue, dangling reference).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
    pub node: Option<NodeId>,
}

/// Per-file graph produced by a single frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Usually the source path
    pub name: String,
    /// Identifier of the frontend that produced this unit ("python", ...)
    pub frontend: String,
    pub graph: CodeGraph,
    pub scopes: ScopeManager,
    /// The TranslationUnit declaration node, root of the AST tree
    pub root: NodeId,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationUnit {
    /// All function declarations in this unit, in arena order.
    pub fn functions(&self) -> Vec<NodeId> {
        self.graph
            .iter()
            .filter(|n| n.kind.is_callable())
            .map(|n| n.id)
            .collect()
    }
}

/// A group of translation units analyzed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub units: Vec<TranslationUnit>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
        }
    }

    /// Frontends that contributed at least one unit.
    pub fn frontends(&self) -> Vec<&str> {
        let mut fs: Vec<&str> = self.units.iter().map(|u| u.frontend.as_str()).collect();
        fs.sort_unstable();
        fs.dedup();
        fs
    }
}

/// The finished multi-layer graph, ready for queries and reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationResult {
    pub components: Vec<Component>,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> impl Iterator<Item = &TranslationUnit> {
        self.components.iter().flat_map(|c| c.units.iter())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.units().flat_map(|u| u.diagnostics.iter())
    }
}
