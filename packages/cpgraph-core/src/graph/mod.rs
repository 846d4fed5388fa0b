//! Graph model: nodes, typed edge layers, arena storage, builder surface.

mod builder;
mod edges;
mod node;
mod store;
mod unit;

pub use builder::GraphBuilder;
pub use edges::{AstEdge, AstRole, CdgEdge, DfgEdge, EogEdge, Granularity};
pub use node::{Node, NodeId, NodeKind};
pub use store::{structurally_equal, CodeGraph};
pub use unit::{Component, Diagnostic, TranslationResult, TranslationUnit};
