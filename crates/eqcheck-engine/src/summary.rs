use std::collections::BTreeMap;

use serde::Serialize;

use crate::benchmark::ExpectedResult;
use crate::classification::Classification;
use crate::partition::PartitionRecord;

/// Aggregate over all partitions of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub partitions: usize,
    pub counts: BTreeMap<Classification, usize>,
    pub verdict: Classification,
}

impl RunSummary {
    pub fn from_records(run_id: &str, records: &[PartitionRecord]) -> Self {
        let mut counts = BTreeMap::new();
        for record in records {
            *counts.entry(record.classification).or_insert(0) += 1;
        }
        Self {
            run_id: run_id.to_string(),
            partitions: records.len(),
            verdict: run_verdict(&counts),
            counts,
        }
    }

    pub fn count(&self, class: Classification) -> usize {
        self.counts.get(&class).copied().unwrap_or(0)
    }

    pub fn matches_expected(&self, expected: ExpectedResult) -> bool {
        self.verdict == expected.classification()
    }
}

/// Reduce per-partition classes to one verdict for the run.
///
/// A single NEQ partition makes the run NEQ. Otherwise the first operational
/// failure (ERROR, TIMEOUT, DEPTH_LIMITED, UNKNOWN) wins, then MAYBE_NEQ,
/// then MAYBE_EQ. A run whose partitions are all EQ or UNREACHABLE is EQ when
/// at least one is EQ. A run that recorded nothing is MISSING.
pub fn run_verdict(counts: &BTreeMap<Classification, usize>) -> Classification {
    let has = |class: Classification| counts.get(&class).is_some_and(|n| *n > 0);
    if counts.values().all(|n| *n == 0) {
        return Classification::Missing;
    }
    [
        Classification::Neq,
        Classification::Missing,
        Classification::BaseToolMissing,
        Classification::Error,
        Classification::Timeout,
        Classification::DepthLimited,
        Classification::Unknown,
        Classification::MaybeNeq,
        Classification::MaybeEq,
        Classification::Eq,
    ]
    .into_iter()
    .find(|class| has(*class))
    .unwrap_or(Classification::Unreachable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(classes: &[Classification]) -> BTreeMap<Classification, usize> {
        let mut map = BTreeMap::new();
        for class in classes {
            *map.entry(*class).or_insert(0) += 1;
        }
        map
    }

    #[test]
    fn empty_run_is_missing() {
        assert_eq!(run_verdict(&BTreeMap::new()), Classification::Missing);
    }

    #[test]
    fn any_neq_makes_the_run_neq() {
        use Classification::*;
        assert_eq!(run_verdict(&counts(&[Eq, Timeout, Neq, MaybeEq])), Neq);
    }

    #[test]
    fn operational_failures_outrank_approximations() {
        use Classification::*;
        assert_eq!(run_verdict(&counts(&[Eq, MaybeNeq, Timeout])), Timeout);
        assert_eq!(run_verdict(&counts(&[Eq, MaybeNeq, MaybeEq])), MaybeNeq);
        assert_eq!(run_verdict(&counts(&[Eq, Unreachable, MaybeEq])), MaybeEq);
    }

    #[test]
    fn unreachable_partitions_do_not_block_eq() {
        use Classification::*;
        assert_eq!(run_verdict(&counts(&[Eq, Unreachable, Eq])), Eq);
        assert_eq!(run_verdict(&counts(&[Unreachable])), Unreachable);
    }
}
