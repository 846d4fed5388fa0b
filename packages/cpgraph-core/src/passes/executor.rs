//! Pass execution
//!
//! Resolves the configured pass ids against the builtin table
//! (auto-registering hard dependencies), computes the schedule once, and
//! drives the passes tier by tier: unit-granularity passes fan out over
//! units with rayon, component- and result-granularity passes run
//! single-threaded after the implicit barrier between passes. Any pass
//! error is fatal to the whole run; a missing required frontend merely
//! skips the pass for that target.

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, info};

use super::ordering::order_passes;
use super::{builtin_pass, Pass, PassDescriptor, PassGranularity, PassState};
use crate::context::{TranslationConfig, TranslationContext};
use crate::graph::{NodeKind, TranslationResult};
use crate::shared::models::{CpgError, Result};

pub struct PassExecutor {
    passes: Vec<Box<dyn Pass>>,
    order: Vec<usize>,
    states: DashMap<(String, String), PassState>,
}

impl PassExecutor {
    /// Resolve and schedule the configured passes. Configuration problems
    /// (unknown pass, unsatisfiable frontend requirement, dependency
    /// cycle) surface here, before any analysis work starts.
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let mut ids: Vec<String> = config.registered_passes.clone();
        let mut i = 0;
        while i < ids.len() {
            let pass = builtin_pass(&ids[i])
                .ok_or_else(|| CpgError::configuration(format!("unknown pass '{}'", ids[i])))?;
            for dep in pass.descriptor().hard_depends_on {
                if !ids.iter().any(|id| id == dep) {
                    debug!(pass = ids[i], dep, "auto-registering hard dependency");
                    ids.push(dep.to_string());
                }
            }
            i += 1;
        }

        let passes: Vec<Box<dyn Pass>> = ids
            .iter()
            .map(|id| builtin_pass(id).ok_or_else(|| CpgError::configuration(format!("unknown pass '{id}'"))))
            .collect::<Result<_>>()?;

        if !config.enabled_frontends.is_empty() {
            for pass in &passes {
                if let Some(fe) = pass.descriptor().required_frontend {
                    if !config.enabled_frontends.iter().any(|e| e == fe) {
                        return Err(CpgError::configuration(format!(
                            "pass '{}' requires frontend '{fe}', which is not enabled",
                            pass.descriptor().id
                        )));
                    }
                }
            }
        }

        let descriptors: Vec<&PassDescriptor> =
            passes.iter().map(|p| p.descriptor()).collect();
        let order = order_passes(&descriptors)?;

        let states = DashMap::new();
        for pass in &passes {
            states.insert(
                (pass.descriptor().id.to_string(), "*".to_string()),
                PassState::Registered,
            );
        }
        Ok(Self { passes, order, states })
    }

    /// Execution state of `pass` on `target` ("*" is the whole-run entry,
    /// unit names key per-unit states).
    pub fn state(&self, pass: &str, target: &str) -> Option<PassState> {
        self.states
            .get(&(pass.to_string(), target.to_string()))
            .map(|s| *s)
    }

    /// Run all scheduled passes over the result.
    pub fn run(&self, result: &mut TranslationResult, ctx: &TranslationContext) -> Result<()> {
        if ctx.config.fail_on_parse_error {
            if let Some((unit, message)) = first_parse_problem(result) {
                return Err(CpgError::parse(unit, message));
            }
        }
        for pass in &self.passes {
            self.states.insert(
                (pass.descriptor().id.to_string(), "*".to_string()),
                PassState::Scheduled,
            );
        }

        for &i in &self.order {
            let pass = &self.passes[i];
            let desc = pass.descriptor();
            let id = desc.id;
            ctx.check_budget(total_nodes(result))?;
            self.states
                .insert((id.to_string(), "*".to_string()), PassState::Running);
            info!(pass = id, granularity = ?desc.granularity, "running pass");

            let outcome = match desc.granularity {
                PassGranularity::Unit => self.run_unit_pass(pass.as_ref(), result, ctx),
                PassGranularity::Component => self.run_component_pass(pass.as_ref(), result, ctx),
                PassGranularity::WholeResult => {
                    match desc.required_frontend {
                        Some(fe)
                            if !result.units().any(|u| u.frontend == fe) =>
                        {
                            self.states
                                .insert((id.to_string(), "*".to_string()), PassState::Skipped);
                            Ok(())
                        }
                        _ => pass.run_on_result(result, ctx).map_err(|e| {
                            CpgError::pass_failed(id, "<result>", e.to_string())
                        }),
                    }
                }
            };
            match outcome {
                Ok(()) => {
                    self.states
                        .insert((id.to_string(), "*".to_string()), PassState::Completed);
                }
                Err(e) => {
                    self.states
                        .insert((id.to_string(), "*".to_string()), PassState::Failed);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn run_unit_pass(
        &self,
        pass: &dyn Pass,
        result: &mut TranslationResult,
        ctx: &TranslationContext,
    ) -> Result<()> {
        let desc = pass.descriptor();
        let node_count = total_nodes(result);
        for component in result.components.iter_mut() {
            component.units.par_iter_mut().try_for_each(|unit| {
                // a long unit tier can still exhaust the budget between
                // the pass-boundary checks
                ctx.check_budget(node_count)?;
                let key = (desc.id.to_string(), unit.name.clone());
                if let Some(fe) = desc.required_frontend {
                    if unit.frontend != fe {
                        self.states.insert(key, PassState::Skipped);
                        return Ok(());
                    }
                }
                self.states.insert(key.clone(), PassState::Running);
                match pass.run_on_unit(unit, ctx) {
                    Ok(()) => {
                        self.states.insert(key, PassState::Completed);
                        Ok(())
                    }
                    Err(e) => {
                        self.states.insert(key, PassState::Failed);
                        Err(CpgError::pass_failed(desc.id, &unit.name, e.to_string()))
                    }
                }
            })?;
        }
        Ok(())
    }

    fn run_component_pass(
        &self,
        pass: &dyn Pass,
        result: &mut TranslationResult,
        ctx: &TranslationContext,
    ) -> Result<()> {
        let desc = pass.descriptor();
        for component in result.components.iter_mut() {
            let key = (desc.id.to_string(), component.name.clone());
            if let Some(fe) = desc.required_frontend {
                if !component.units.iter().any(|u| u.frontend == fe) {
                    self.states.insert(key, PassState::Skipped);
                    continue;
                }
            }
            self.states.insert(key.clone(), PassState::Running);
            match pass.run_on_component(component, ctx) {
                Ok(()) => {
                    self.states.insert(key, PassState::Completed);
                }
                Err(e) => {
                    self.states.insert(key, PassState::Failed);
                    return Err(CpgError::pass_failed(desc.id, &component.name, e.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn total_nodes(result: &TranslationResult) -> usize {
    result.units().map(|u| u.graph.len()).sum()
}

fn first_parse_problem(result: &TranslationResult) -> Option<(String, String)> {
    for unit in result.units() {
        for node in unit.graph.iter() {
            if let NodeKind::Problem { description } = &node.kind {
                return Some((unit.name.clone(), description.clone()));
            }
        }
    }
    None
}

/// Run the full configured pipeline over a translation result, returning
/// the context (type registry, timing) for inspection.
pub fn analyze(result: &mut TranslationResult, config: TranslationConfig) -> Result<TranslationContext> {
    let executor = PassExecutor::new(&config)?;
    let ctx = TranslationContext::new(config);
    executor.run(result, &ctx)?;
    info!(
        nodes = total_nodes(result),
        types = ctx.types.len(),
        elapsed = ?ctx.elapsed(),
        "analysis finished"
    );
    Ok(ctx)
}
