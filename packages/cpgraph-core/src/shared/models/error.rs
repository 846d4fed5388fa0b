//! Typed errors for the cpgraph-core crate
//!
//! Using thiserror for ergonomic error handling. Configuration errors are
//! raised at scheduling time before any analysis runs; pass errors are
//! fatal to the whole run and carry the failing pass plus the unit being
//! processed.

use thiserror::Error;

/// Unified error type for graph construction and analysis.
#[derive(Error, Debug, Clone)]
pub enum CpgError {
    /// Frontend reported a parse problem and the run is configured to fail hard
    #[error("Failed to parse {file_path}: {reason}")]
    ParseError { file_path: String, reason: String },

    /// Adding an AST edge would give a node a second parent
    #[error("AST ownership violation: node {child} already has parent {existing_parent}")]
    OwnershipViolation { child: u32, existing_parent: u32 },

    /// A node id does not exist in the graph arena
    #[error("Unknown node id {0}")]
    UnknownNode(u32),

    /// Scope stack misuse (leaving the global scope, unknown scope id)
    #[error("Scope error: {0}")]
    ScopeError(String),

    /// Pass dependency configuration cannot be satisfied
    #[error("Pass configuration error: {0}")]
    ConfigurationError(String),

    /// The declared pass dependencies form a cycle
    #[error("Pass dependency cycle: {cycle:?}")]
    DependencyCycle { cycle: Vec<String> },

    /// A pass failed while processing a unit; fatal, no retry
    #[error("Pass '{pass}' failed on {unit}: {reason}")]
    PassFailed {
        pass: String,
        unit: String,
        reason: String,
    },

    /// The per-run wall-clock or heap budget was exhausted
    #[error("Budget exhausted: {0}")]
    BudgetExhausted(String),

    /// The abstract evaluator met a node kind it cannot model.
    /// Explicit sentinel, never silently approximated as a number.
    #[error("Cannot evaluate: {0}")]
    CannotEvaluate(String),

    /// Internal invariant violation (a bug)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CpgError {
    pub fn parse(file_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file_path: file_path.into(),
            reason: reason.into(),
        }
    }

    pub fn scope(reason: impl Into<String>) -> Self {
        Self::ScopeError(reason.into())
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::ConfigurationError(reason.into())
    }

    pub fn pass_failed(
        pass: impl Into<String>,
        unit: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PassFailed {
            pass: pass.into(),
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    pub fn budget(reason: impl Into<String>) -> Self {
        Self::BudgetExhausted(reason.into())
    }

    pub fn cannot_evaluate(reason: impl Into<String>) -> Self {
        Self::CannotEvaluate(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Error category for logging/metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "parse",
            Self::OwnershipViolation { .. } => "ownership",
            Self::UnknownNode(_) => "unknown_node",
            Self::ScopeError(_) => "scope",
            Self::ConfigurationError(_) => "config",
            Self::DependencyCycle { .. } => "config",
            Self::PassFailed { .. } => "pass",
            Self::BudgetExhausted(_) => "budget",
            Self::CannotEvaluate(_) => "evaluate",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, CpgError>;
