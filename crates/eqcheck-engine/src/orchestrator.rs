//! Per-partition control flow.
//!
//! For every comparison site: allocate a partition id, persist the path
//! condition, synthesize and persist the three queries, solve them, classify,
//! and append an immutable [`PartitionRecord`]. Depth-limit events follow the
//! same path with only the reachability query.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use eqcheck_smt::backends::process_backend::ProcessSolver;
use eqcheck_smt::declarations::KnownDeclarations;
use eqcheck_smt::interchange::path_condition_json;
use eqcheck_smt::solver::SolverStatistics;
use eqcheck_smt::uif::UifFlags;
use eqcheck_smt::{
    Expr, QueryKind, QuerySynthesizer, SolverBackend, SolverQuery, SolverResult, SolverStatus,
};

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::classification::{classify, ClassifierInput};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::oracle::{ComparisonSite, EquivalenceOracle};
use crate::partition::{
    OperationalFlags, PartitionCounter, PartitionId, PartitionKind, PartitionRecord,
    PartitionResults, QueryFingerprints,
};
use crate::summary::RunSummary;

/// Mutable state of the partition currently being solved.
#[derive(Debug, Default)]
struct PartitionProgress {
    flags: OperationalFlags,
    results: PartitionResults,
    fingerprints: QueryFingerprints,
    errors: Vec<String>,
}

/// Drives one equivalence run against a solver backend.
pub struct Orchestrator<B: SolverBackend> {
    config: EngineConfig,
    backend: B,
    synthesizer: QuerySynthesizer,
    artifacts: ArtifactStore,
    counter: PartitionCounter,
    partitions: Vec<PartitionRecord>,
    captured_choices: BTreeSet<(u64, u64)>,
}

impl Orchestrator<ProcessSolver> {
    /// Orchestrator backed by the subprocess solver named in `config`.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let backend = ProcessSolver::new(config.solver.clone());
        Self::new(config, backend)
    }
}

impl<B: SolverBackend> Orchestrator<B> {
    pub fn new(config: EngineConfig, backend: B) -> Result<Self, EngineError> {
        let artifacts = ArtifactStore::new(&config.output_dir, &config.run_id)?;
        let synthesizer =
            QuerySynthesizer::new(KnownDeclarations::parse(&config.known_declarations));
        info!(
            run_id = artifacts.run_id(),
            output_dir = %artifacts.dir().display(),
            solver = backend.name(),
            "Equivalence run started"
        );
        Ok(Self {
            config,
            backend,
            synthesizer,
            artifacts,
            counter: PartitionCounter::default(),
            partitions: Vec::new(),
            captured_choices: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Classified partitions in allocation order.
    pub fn partitions(&self) -> &[PartitionRecord] {
        &self.partitions
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(self.artifacts.run_id(), &self.partitions)
    }

    /// Write the run summary next to the partition artifacts.
    pub fn finish(self) -> Result<RunSummary, EngineError> {
        let summary = self.summary();
        let json = serde_json::to_string_pretty(&summary)?;
        self.artifacts.write(&self.artifacts.result_path(), &json)?;
        info!(
            partitions = summary.partitions,
            verdict = %summary.verdict,
            "Equivalence run finished"
        );
        Ok(summary)
    }

    /// Solve and classify one comparison site.
    ///
    /// A malformed expression fails before a partition id is allocated.
    pub fn process_comparison(
        &mut self,
        site: ComparisonSite,
    ) -> Result<&PartitionRecord, EngineError> {
        let ComparisonSite {
            path_condition,
            old,
            new,
            flags,
        } = site;
        let queries = self
            .synthesizer
            .synthesize(path_condition.as_ref(), &old, &new)?;
        let pc_json = path_condition_json(path_condition.as_ref())?;
        let uif = UifFlags::from_exprs(path_condition.as_ref(), &old, &new);

        let id = self.counter.allocate();
        debug!(partition = id.0, "Comparison site reached");
        self.artifacts
            .write_partition(id, ArtifactKind::JsonPc, &pc_json)?;

        let mut progress = PartitionProgress {
            flags,
            ..PartitionProgress::default()
        };
        if flags.is_error {
            warn!(partition = id.0, "Site flagged as erroneous; solver not invoked");
        } else {
            for kind in QueryKind::ALL {
                if kind == QueryKind::Reachability && !self.config.solve_reachability {
                    continue;
                }
                self.solve_query(id, queries.get(kind), uif, &mut progress)?;
                if progress.flags.is_error {
                    break;
                }
            }
        }

        let equivalent = progress.results.status(QueryKind::Neq) == Some(SolverStatus::Unsat);
        self.record(
            id,
            PartitionKind::Comparison,
            path_condition,
            Some(old),
            Some(new),
            uif,
            progress,
            equivalent,
        )
    }

    /// Record a partition abandoned at the exploration depth bound.
    pub fn process_depth_limit(
        &mut self,
        path_condition: Option<Expr>,
    ) -> Result<&PartitionRecord, EngineError> {
        let query = self.synthesizer.reachability(path_condition.as_ref())?;
        let pc_json = path_condition_json(path_condition.as_ref())?;
        let uif = UifFlags::from_path_condition(path_condition.as_ref());

        let id = self.counter.allocate();
        debug!(partition = id.0, "Depth limit reached");
        self.artifacts
            .write_partition(id, ArtifactKind::JsonPc, &pc_json)?;

        let mut progress = PartitionProgress {
            flags: OperationalFlags {
                is_depth_limited: true,
                ..OperationalFlags::default()
            },
            ..PartitionProgress::default()
        };
        if self.config.solve_reachability {
            self.solve_query(id, &query, uif, &mut progress)?;
        }
        self.record(
            id,
            PartitionKind::DepthLimit,
            path_condition,
            None,
            None,
            uif,
            progress,
            false,
        )
    }

    /// Persist the path condition of a choice point. Absent path conditions
    /// are skipped.
    pub fn capture_choice(
        &mut self,
        state_id: u64,
        choice_id: u64,
        path_condition: Option<&Expr>,
    ) -> Result<(), EngineError> {
        let Some(pc) = path_condition else {
            debug!(state_id, choice_id, "No path condition at choice point");
            return Ok(());
        };
        if !self.captured_choices.insert((state_id, choice_id)) {
            return Err(EngineError::DuplicateChoice {
                state: state_id,
                choice: choice_id,
            });
        }
        let json = path_condition_json(Some(pc))?;
        self.artifacts
            .write(&self.artifacts.choice_path(state_id, choice_id), &json)?;
        Ok(())
    }

    fn solve_query(
        &self,
        id: PartitionId,
        query: &SolverQuery,
        uif: UifFlags,
        progress: &mut PartitionProgress,
    ) -> Result<(), EngineError> {
        let kind = query.kind;
        let query_path = self
            .artifacts
            .write_partition(id, ArtifactKind::ToSolve(kind), &query.text)?;
        progress.fingerprints.set(kind, query.fingerprint());

        debug!(partition = id.0, query = %kind, solver = self.backend.name(), "Solving");
        let result = match self.backend.solve(query, &query_path) {
            Ok(result) => result,
            Err(err) => {
                warn!(partition = id.0, query = %kind, error = %err, "Solver did not run");
                progress.errors.push(format!("{kind}: {err}"));
                SolverResult {
                    status: SolverStatus::Error,
                    model: None,
                    diagnostics: err.to_string(),
                    statistics: SolverStatistics::default(),
                }
            }
        };
        debug!(
            partition = id.0,
            query = %kind,
            status = %result.status,
            elapsed_ms = result.statistics.elapsed_ms as u64,
            "Solver answered"
        );
        if result.status == SolverStatus::Error {
            progress.flags.is_error = true;
        }

        let downgrade = kind == QueryKind::Neq
            && result.status == SolverStatus::Sat
            && uif.any()
            && self.config.downgrade_uif_answers;
        let answer = if downgrade {
            warn!(
                partition = id.0,
                "Counterexample relies on uninterpreted functions; answer recorded as unknown"
            );
            SolverStatus::Unknown.as_token()
        } else {
            result.status.as_token()
        };
        self.artifacts
            .write_partition(id, ArtifactKind::Answer(kind), answer)?;

        if kind.requests_model() && result.status == SolverStatus::Sat {
            self.artifacts.write_partition(
                id,
                ArtifactKind::Model,
                result.model.as_deref().unwrap_or(""),
            )?;
        }
        if !result.diagnostics.trim().is_empty() {
            self.artifacts
                .write_partition(id, ArtifactKind::Errors(kind), &result.diagnostics)?;
        }

        progress.results.set(kind, result);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        id: PartitionId,
        kind: PartitionKind,
        path_condition: Option<Expr>,
        old: Option<Expr>,
        new: Option<Expr>,
        uif: UifFlags,
        progress: PartitionProgress,
        equivalent: bool,
    ) -> Result<&PartitionRecord, EngineError> {
        let PartitionProgress {
            flags,
            results,
            fingerprints,
            errors,
        } = progress;
        let input = ClassifierInput::for_discovered(
            flags,
            results.status(QueryKind::Reachability),
            results.status(QueryKind::Neq),
            results.status(QueryKind::Eq),
            uif.pc,
            uif.any(),
        );
        let classification = classify(&input)?;

        if kind == PartitionKind::Comparison {
            self.artifacts.write_partition(
                id,
                ArtifactKind::HasUif,
                if uif.any() { "true" } else { "false" },
            )?;
        }

        let record = PartitionRecord {
            id,
            kind,
            path_condition,
            old,
            new,
            flags,
            uif,
            results,
            fingerprints,
            classification,
            equivalent,
            errors,
        };
        let json = serde_json::to_string_pretty(&record)?;
        self.artifacts
            .write_partition(id, ArtifactKind::Partition, &json)?;

        info!(
            partition = id.0,
            kind = ?kind,
            classification = %classification,
            equivalent,
            "Partition classified"
        );
        let index = self.partitions.len();
        self.partitions.push(record);
        Ok(&self.partitions[index])
    }
}

impl<B: SolverBackend> EquivalenceOracle for Orchestrator<B> {
    fn are_equivalent(&mut self, site: ComparisonSite) -> Result<bool, EngineError> {
        self.process_comparison(site).map(|record| record.equivalent)
    }

    fn depth_limit_reached(&mut self, path_condition: Option<Expr>) -> Result<(), EngineError> {
        self.process_depth_limit(path_condition).map(|_| ())
    }

    fn choice_path_condition(
        &mut self,
        state_id: u64,
        choice_id: u64,
        path_condition: Option<&Expr>,
    ) -> Result<(), EngineError> {
        self.capture_choice(state_id, choice_id, path_condition)
    }
}
