//! Per-run translation context
//!
//! All state that would otherwise be process-wide (type identity tables,
//! run configuration, the budget clock) lives in one context object
//! threaded through every pass call. Nothing in this crate is a global
//! singleton.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::{CpgError, Result};

/// Wall-clock/heap budget wrapping the entire pipeline run. Expiry aborts
/// the run as a whole; there is no per-pass cancellation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunBudget {
    pub max_duration: Option<Duration>,
    /// Proxy for heap usage: total node count across all units
    pub max_nodes: Option<usize>,
}

/// Pure parameters handed to the scheduler; not part of the core's logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Pass ids to register, in registration order (ties in the
    /// topological order are broken by this order)
    pub registered_passes: Vec<String>,
    /// Synthesize declarations for unresolved calls/references
    pub infer_missing_declarations: bool,
    /// Treat frontend parse problems as fatal instead of recording a
    /// best-effort partial AST
    pub fail_on_parse_error: bool,
    /// Language frontends enabled for this run
    pub enabled_frontends: Vec<String>,
    /// Skip CDG computation for functions above this cyclomatic complexity
    pub max_cdg_complexity: Option<usize>,
    pub budget: RunBudget,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            registered_passes: crate::passes::default_pass_ids(),
            infer_missing_declarations: true,
            fail_on_parse_error: false,
            enabled_frontends: Vec::new(),
            max_cdg_complexity: None,
            budget: RunBudget::default(),
        }
    }
}

/// Interning table for type identity, owned by the run context.
/// Written single-threaded at the component tier, read concurrently by
/// later unit-tier passes; hence the lock.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<FxHashMap<String, u32>>,
}

impl TypeRegistry {
    pub fn intern(&self, name: &str) -> u32 {
        if let Some(id) = self.inner.read().get(name) {
            return *id;
        }
        let mut map = self.inner.write();
        let next = map.len() as u32;
        *map.entry(name.to_string()).or_insert(next)
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.inner.read().get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// The explicit per-run context threaded through every pass call.
#[derive(Debug)]
pub struct TranslationContext {
    pub config: TranslationConfig,
    pub types: TypeRegistry,
    started: Instant,
}

impl TranslationContext {
    pub fn new(config: TranslationConfig) -> Self {
        Self {
            config,
            types: TypeRegistry::default(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Check the run budget; called at pass/unit boundaries.
    pub fn check_budget(&self, total_nodes: usize) -> Result<()> {
        if let Some(max) = self.config.budget.max_duration {
            let elapsed = self.elapsed();
            if elapsed > max {
                return Err(CpgError::budget(format!(
                    "wall clock {elapsed:?} exceeded {max:?}"
                )));
            }
        }
        if let Some(max) = self.config.budget.max_nodes {
            if total_nodes > max {
                return Err(CpgError::budget(format!(
                    "{total_nodes} nodes exceed limit of {max}"
                )));
            }
        }
        Ok(())
    }
}
