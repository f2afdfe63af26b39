use serde::{Deserialize, Serialize};

use eqcheck_smt::uif::UifFlags;
use eqcheck_smt::{Expr, QueryKind, SolverResult, SolverStatus};

use crate::classification::Classification;

/// Conditions raised by the exploration engine or the solver adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationalFlags {
    pub is_error: bool,
    pub is_timeout: bool,
    pub is_depth_limited: bool,
}

/// Partition identifier, unique and increasing within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(pub u32);

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Allocates partition ids. Starts at 1 and never reuses a value.
#[derive(Debug, Clone)]
pub struct PartitionCounter {
    next: u32,
}

impl Default for PartitionCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl PartitionCounter {
    pub fn allocate(&mut self) -> PartitionId {
        let id = PartitionId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    /// Reached a comparison of old and new results.
    Comparison,
    /// Abandoned when the exploration depth bound was hit.
    DepthLimit,
}

/// Solver outcomes of one partition, by query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionResults {
    pub pc: Option<SolverResult>,
    pub neq: Option<SolverResult>,
    pub eq: Option<SolverResult>,
}

impl PartitionResults {
    pub fn get(&self, kind: QueryKind) -> Option<&SolverResult> {
        match kind {
            QueryKind::Reachability => self.pc.as_ref(),
            QueryKind::Neq => self.neq.as_ref(),
            QueryKind::Eq => self.eq.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, kind: QueryKind, result: SolverResult) {
        let slot = match kind {
            QueryKind::Reachability => &mut self.pc,
            QueryKind::Neq => &mut self.neq,
            QueryKind::Eq => &mut self.eq,
        };
        *slot = Some(result);
    }

    pub fn status(&self, kind: QueryKind) -> Option<SolverStatus> {
        self.get(kind).map(|r| r.status)
    }
}

/// Hex SHA-256 of each query sent to the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryFingerprints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<String>,
}

impl QueryFingerprints {
    pub(crate) fn set(&mut self, kind: QueryKind, fingerprint: String) {
        match kind {
            QueryKind::Reachability => self.pc = Some(fingerprint),
            QueryKind::Neq => self.neq = Some(fingerprint),
            QueryKind::Eq => self.eq = Some(fingerprint),
        }
    }
}

/// Everything known about one partition once it has been classified.
///
/// Records are only built after classification and are never mutated or
/// removed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionRecord {
    pub id: PartitionId,
    pub kind: PartitionKind,
    pub path_condition: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Expr>,
    pub flags: OperationalFlags,
    pub uif: UifFlags,
    pub results: PartitionResults,
    pub fingerprints: QueryFingerprints,
    pub classification: Classification,
    /// Live answer handed back to the exploration engine.
    pub equivalent: bool,
    /// Solver launch failures that forced the partition into ERROR.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}
