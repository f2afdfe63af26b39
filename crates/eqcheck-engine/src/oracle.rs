//! The seam between the exploration engine and the equivalence checker.

use serde::{Deserialize, Serialize};

use eqcheck_smt::Expr;

use crate::error::EngineError;
use crate::partition::OperationalFlags;

/// A point where the engine holds both program versions' results under one
/// path condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonSite {
    /// `None` when the path is unconstrained.
    #[serde(default)]
    pub path_condition: Option<Expr>,
    pub old: Expr,
    pub new: Expr,
    #[serde(default)]
    pub flags: OperationalFlags,
}

impl ComparisonSite {
    pub fn new(path_condition: Option<Expr>, old: Expr, new: Expr) -> Self {
        Self {
            path_condition,
            old,
            new,
            flags: OperationalFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: OperationalFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Callbacks the exploration engine invokes while it walks both programs.
pub trait EquivalenceOracle {
    /// Classify a comparison site. Returns `true` only when the results were
    /// proven equal under the path condition.
    fn are_equivalent(&mut self, site: ComparisonSite) -> Result<bool, EngineError>;

    /// Record a partition the engine gave up on at its depth bound.
    fn depth_limit_reached(&mut self, path_condition: Option<Expr>) -> Result<(), EngineError>;

    /// Capture the path condition at a choice point for offline inspection.
    fn choice_path_condition(
        &mut self,
        state_id: u64,
        choice_id: u64,
        path_condition: Option<&Expr>,
    ) -> Result<(), EngineError>;
}
