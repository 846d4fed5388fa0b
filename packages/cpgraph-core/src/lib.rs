/*
 * cpgraph-core - Code Property Graph Engine
 *
 * Layered graph architecture:
 * - shared/     : Common models (spans, errors)
 * - graph/      : Node arena, typed edge layers, builder surface
 * - scopes/     : Scope tree and symbol tables
 * - resolution/ : Call/overload resolution with inference
 * - passes/     : Scheduler plus the EOG/DFG/CDG/loop passes
 * - analysis/   : Interval abstract interpretation
 *
 * Frontends populate the AST ownership layer through `GraphBuilder`;
 * everything else (evaluation order, data flow, control dependence,
 * loop labels) is reconstructed by scheduled passes. Unit-granularity
 * passes fan out over translation units with rayon.
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::match_like_matches_macro)] // Match for readability

pub mod analysis;
pub mod context;
pub mod graph;
pub mod passes;
pub mod resolution;
pub mod scopes;
pub mod shared;

pub use analysis::{Bound, IntervalEvaluator, LatticeInterval};
pub use context::{RunBudget, TranslationConfig, TranslationContext};
pub use graph::{
    AstRole, CodeGraph, Component, Diagnostic, GraphBuilder, Granularity, Node, NodeId, NodeKind,
    TranslationResult, TranslationUnit,
};
pub use passes::{analyze, Pass, PassExecutor, PassState};
pub use shared::models::{CpgError, Result};
