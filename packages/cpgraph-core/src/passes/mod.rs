//! Pass framework
//!
//! Passes enrich the graph after the frontends finish: evaluation order,
//! symbol/call resolution, data flow, control dependence, loop labeling.
//! Every pass carries a static descriptor (id, dependencies, ordering
//! flags, granularity); the scheduler works from these tables alone and
//! never inspects pass internals.

mod cdg;
mod dfg;
mod eog;
mod executor;
mod ordering;
mod scc;
mod symbols;

pub use cdg::{cyclomatic_complexity, ControlDependencePass};
pub use dfg::DataFlowPass;
pub use eog::EvaluationOrderPass;
pub use executor::{analyze, PassExecutor};
pub use ordering::order_passes;
pub use scc::{basic_blocks, LoopLabelPass};
pub use symbols::SymbolResolverPass;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::context::TranslationContext;
use crate::graph::{Component, TranslationResult, TranslationUnit};
use crate::shared::models::Result;

/// Scope of graph state a pass may touch. Unit-granularity passes run in
/// parallel across units; the coarser tiers run single-threaded after a
/// barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassGranularity {
    Unit,
    Component,
    WholeResult,
}

/// Lifecycle of one pass execution on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassState {
    Registered,
    Scheduled,
    Running,
    Completed,
    Failed,
    /// Required frontend produced no matching unit; not a failure.
    Skipped,
}

/// Static metadata describing one pass to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDescriptor {
    pub id: &'static str,
    /// Must run earlier; auto-registered when missing
    pub hard_depends_on: &'static [&'static str],
    /// Must run earlier if present; never auto-registered
    pub soft_depends_on: &'static [&'static str],
    /// This pass must run before the named passes (a reverse dependency)
    pub execute_before: &'static [&'static str],
    pub execute_first: bool,
    pub execute_last: bool,
    /// Held back until no non-late pass is ready
    pub execute_late: bool,
    /// Only run on units produced by this frontend
    pub required_frontend: Option<&'static str>,
    pub granularity: PassGranularity,
}

impl PassDescriptor {
    pub const fn new(id: &'static str, granularity: PassGranularity) -> Self {
        Self {
            id,
            hard_depends_on: &[],
            soft_depends_on: &[],
            execute_before: &[],
            execute_first: false,
            execute_last: false,
            execute_late: false,
            required_frontend: None,
            granularity,
        }
    }
}

/// A graph-enriching pass. Exactly one of the `run_on_*` hooks is invoked
/// per target, chosen by the descriptor's granularity.
pub trait Pass: Send + Sync {
    fn descriptor(&self) -> &'static PassDescriptor;

    fn run_on_unit(&self, _unit: &mut TranslationUnit, _ctx: &TranslationContext) -> Result<()> {
        Ok(())
    }

    fn run_on_component(
        &self,
        _component: &mut Component,
        _ctx: &TranslationContext,
    ) -> Result<()> {
        Ok(())
    }

    fn run_on_result(
        &self,
        _result: &mut TranslationResult,
        _ctx: &TranslationContext,
    ) -> Result<()> {
        Ok(())
    }
}

type PassFactory = fn() -> Box<dyn Pass>;

/// All passes this crate ships, id → factory. The scheduler consults this
/// table to auto-register hard dependencies.
pub static BUILTIN_PASSES: Lazy<Vec<(&'static str, PassFactory)>> = Lazy::new(|| {
    vec![
        (eog::DESCRIPTOR.id, || Box::new(EvaluationOrderPass)),
        (symbols::DESCRIPTOR.id, || Box::new(SymbolResolverPass)),
        (scc::DESCRIPTOR.id, || Box::new(LoopLabelPass)),
        (dfg::DESCRIPTOR.id, || Box::new(DataFlowPass)),
        (cdg::DESCRIPTOR.id, || Box::new(ControlDependencePass)),
    ]
});

/// Instantiate a builtin pass by id.
pub fn builtin_pass(id: &str) -> Option<Box<dyn Pass>> {
    BUILTIN_PASSES
        .iter()
        .find(|(pid, _)| *pid == id)
        .map(|(_, factory)| factory())
}

/// The default registration order for a full analysis run.
pub fn default_pass_ids() -> Vec<String> {
    BUILTIN_PASSES.iter().map(|(id, _)| id.to_string()).collect()
}
