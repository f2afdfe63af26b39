//! The partition decision procedure.
//!
//! Three solver answers (path-condition reachability, NEQ, EQ), the UIF flags
//! and the operational flags are reduced to exactly one [`Classification`] by a
//! strict priority chain; the first matching rule wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eqcheck_smt::SolverStatus;

use crate::partition::OperationalFlags;

/// Outcome class of one partition. Declaration order is evaluation priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Missing,
    BaseToolMissing,
    Error,
    Unreachable,
    Timeout,
    DepthLimited,
    Unknown,
    MaybeNeq,
    MaybeEq,
    Neq,
    Eq,
}

impl Classification {
    pub const ALL: [Classification; 11] = [
        Classification::Missing,
        Classification::BaseToolMissing,
        Classification::Error,
        Classification::Unreachable,
        Classification::Timeout,
        Classification::DepthLimited,
        Classification::Unknown,
        Classification::MaybeNeq,
        Classification::MaybeEq,
        Classification::Neq,
        Classification::Eq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Missing => "MISSING",
            Classification::BaseToolMissing => "BASE_TOOL_MISSING",
            Classification::Error => "ERROR",
            Classification::Unreachable => "UNREACHABLE",
            Classification::Timeout => "TIMEOUT",
            Classification::DepthLimited => "DEPTH_LIMITED",
            Classification::Unknown => "UNKNOWN",
            Classification::MaybeNeq => "MAYBE_NEQ",
            Classification::MaybeEq => "MAYBE_EQ",
            Classification::Neq => "NEQ",
            Classification::Eq => "EQ",
        }
    }

    /// EQ, NEQ and UNREACHABLE are exact answers; everything else carries
    /// an approximation or an operational failure.
    pub fn is_definitive(self) -> bool {
        matches!(
            self,
            Classification::Eq | Classification::Neq | Classification::Unreachable
        )
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Classification::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown classification `{s}`"))
    }
}

/// Everything the classifier looks at.
///
/// A status of `None` means the query was not run (depth-limit partitions,
/// or partitions that stopped at an operational error).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierInput {
    pub missing: bool,
    pub base_tool_missing: bool,
    pub flags: OperationalFlags,
    pub pc: Option<SolverStatus>,
    pub neq: Option<SolverStatus>,
    pub eq: Option<SolverStatus>,
    pub has_uif_pc: bool,
    pub has_uif_any: bool,
}

impl ClassifierInput {
    /// Input for a partition discovered by the exploration engine. Such a
    /// partition can never be MISSING or BASE_TOOL_MISSING.
    pub fn for_discovered(
        flags: OperationalFlags,
        pc: Option<SolverStatus>,
        neq: Option<SolverStatus>,
        eq: Option<SolverStatus>,
        has_uif_pc: bool,
        has_uif_any: bool,
    ) -> Self {
        let input = Self {
            missing: false,
            base_tool_missing: false,
            flags,
            pc,
            neq,
            eq,
            has_uif_pc,
            has_uif_any,
        };
        debug_assert!(!input.missing && !input.base_tool_missing);
        input
    }
}

/// No rule of the priority chain matched. Always a defect; aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to classify partition: {input:?}")]
pub struct ClassifierInvariantViolation {
    pub input: ClassifierInput,
}

fn is(status: Option<SolverStatus>, expected: SolverStatus) -> bool {
    status == Some(expected)
}

/// Apply the priority chain.
pub fn classify(input: &ClassifierInput) -> Result<Classification, ClassifierInvariantViolation> {
    use SolverStatus::{Sat, Unknown, Unsat};

    let ClassifierInput {
        missing,
        base_tool_missing,
        flags,
        pc,
        neq,
        eq,
        has_uif_pc,
        has_uif_any,
    } = *input;

    let class = if missing {
        Classification::Missing
    } else if base_tool_missing {
        Classification::BaseToolMissing
    } else if flags.is_error {
        Classification::Error
    } else if is(pc, Unsat) {
        Classification::Unreachable
    } else if flags.is_timeout {
        Classification::Timeout
    } else if flags.is_depth_limited {
        Classification::DepthLimited
    } else if is(pc, Unknown) || is(neq, Unknown) || is(eq, Unknown) {
        Classification::Unknown
    } else if is(neq, Sat) && is(eq, Sat) {
        // Some input separates the results and some input unifies them. With
        // UIFs abstracting real computation, the concrete programs might still
        // always agree.
        Classification::MaybeNeq
    } else if is(neq, Unsat) && has_uif_pc {
        // Equal wherever the path condition holds, but the path condition is
        // itself approximate; the concrete partition may be unreachable.
        Classification::MaybeEq
    } else if (is(neq, Sat) && !has_uif_any) || is(eq, Unsat) {
        Classification::Neq
    } else if is(neq, Unsat) && !has_uif_pc {
        Classification::Eq
    } else {
        return Err(ClassifierInvariantViolation { input: *input });
    };
    Ok(class)
}
