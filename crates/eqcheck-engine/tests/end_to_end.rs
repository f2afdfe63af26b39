//! Orchestrator runs against a scripted solver backend.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use eqcheck_engine::replay::{replay, EventOutcome, ExplorationEvent};
use eqcheck_engine::{
    Classification, ComparisonSite, EngineConfig, EngineError, EquivalenceOracle,
    OperationalFlags, Orchestrator, PartitionId, PartitionKind,
};
use eqcheck_smt::solver::SolverStatistics;
use eqcheck_smt::{
    Expr, QueryKind, SmtSort, SolverBackend, SolverError, SolverQuery, SolverResult, SolverStatus,
};
use tempfile::TempDir;

type Script = Box<dyn Fn(QueryKind, &str) -> Result<SolverResult, SolverError>>;

/// Answers each query from a script and remembers what it was asked.
struct ScriptedSolver {
    script: Script,
    calls: RefCell<Vec<(QueryKind, PathBuf)>>,
}

impl ScriptedSolver {
    fn new(script: impl Fn(QueryKind, &str) -> Result<SolverResult, SolverError> + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Fixed statuses for reachability, NEQ and EQ.
    fn statuses(pc: SolverStatus, neq: SolverStatus, eq: SolverStatus) -> Self {
        Self::new(move |kind, _| {
            let status = match kind {
                QueryKind::Reachability => pc,
                QueryKind::Neq => neq,
                QueryKind::Eq => eq,
            };
            Ok(answer(status))
        })
    }

    fn kinds(&self) -> Vec<QueryKind> {
        self.calls.borrow().iter().map(|(k, _)| *k).collect()
    }
}

impl SolverBackend for ScriptedSolver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn solve(&self, query: &SolverQuery, query_path: &Path) -> Result<SolverResult, SolverError> {
        let on_disk = fs::read_to_string(query_path)?;
        assert_eq!(on_disk, query.text, "query must be persisted before solving");
        self.calls
            .borrow_mut()
            .push((query.kind, query_path.to_path_buf()));
        (self.script)(query.kind, &query.text)
    }
}

fn answer(status: SolverStatus) -> SolverResult {
    let stdout = match status {
        SolverStatus::Sat => "sat\n(\n  (define-fun INT0 () Int\n    1)\n)\n",
        SolverStatus::Unsat => "unsat\n",
        SolverStatus::Unknown => "unknown\n",
        SolverStatus::Error => "(error \"unsupported\")\n",
    };
    SolverResult::from_output(stdout, "", SolverStatistics::default())
}

fn config(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        run_id: "IDiff".to_string(),
        output_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    }
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name))
        .unwrap_or_else(|e| panic!("reading {name}: {e}"))
}

fn exists(dir: &TempDir, name: &str) -> bool {
    dir.path().join(name).exists()
}

fn x() -> Expr {
    Expr::int_var("INT0")
}

#[test]
fn identical_results_are_eq() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let equivalent = orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap();
    assert!(equivalent);

    let record = &orch.partitions()[0];
    assert_eq!(record.id, PartitionId(1));
    assert_eq!(record.classification, Classification::Eq);
    assert_eq!(
        orch.backend().kinds(),
        vec![QueryKind::Reachability, QueryKind::Neq, QueryKind::Eq]
    );

    let neq = read(&dir, "IDiff-P1-ToSolve.txt");
    assert!(neq.contains("(declare-fun INT0 () Int)"));
    assert!(neq.contains("(assert true)"));
    assert!(neq.contains("(assert (not (= INT0 INT0)))"));
    assert!(read(&dir, "IDiff-P1-ToSolve-PC.txt").ends_with("(check-sat)\n"));
    assert!(read(&dir, "IDiff-P1-ToSolve-EQ.txt").contains("(assert (= INT0 INT0))"));
    assert_eq!(read(&dir, "IDiff-P1-Answer.txt"), "unsat");
    assert_eq!(read(&dir, "IDiff-P1-Answer-PC.txt"), "sat");
    assert_eq!(read(&dir, "IDiff-P1-Answer-EQ.txt"), "sat");
    assert_eq!(read(&dir, "IDiff-P1-HasUIF.txt"), "false");
    assert!(!exists(&dir, "IDiff-P1-Model.txt"));
    assert!(!exists(&dir, "IDiff-P1-Errors.txt"));

    let pc_json: serde_json::Value =
        serde_json::from_str(&read(&dir, "IDiff-P1-JSON-PC.json")).unwrap();
    assert_eq!(pc_json["kind"], "literal");
    assert_eq!(pc_json["value"], "true");

    let partition: serde_json::Value =
        serde_json::from_str(&read(&dir, "IDiff-P1-Partition.json")).unwrap();
    assert_eq!(partition["classification"], "EQ");
    assert_eq!(partition["equivalent"], true);
}

#[test]
fn negation_on_positive_inputs_is_neq_with_model() {
    let dir = TempDir::new().unwrap();
    let solver =
        ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Sat, SolverStatus::Unsat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let pc = x().gt(Expr::int(0));
    let equivalent = orch
        .are_equivalent(ComparisonSite::new(Some(pc), x(), x().neg()))
        .unwrap();
    assert!(!equivalent);

    let record = &orch.partitions()[0];
    assert_eq!(record.classification, Classification::Neq);
    let witness = record.results.neq.as_ref().unwrap().witness().unwrap();
    assert_eq!(witness.get_int("INT0"), Some(1));

    assert_eq!(read(&dir, "IDiff-P1-Answer.txt"), "sat");
    assert!(read(&dir, "IDiff-P1-Model.txt").contains("define-fun INT0"));
    assert!(read(&dir, "IDiff-P1-ToSolve.txt").contains("(assert (> INT0 0))"));
}

#[test]
fn contradictory_path_condition_is_unreachable() {
    let dir = TempDir::new().unwrap();
    let solver =
        ScriptedSolver::statuses(SolverStatus::Unsat, SolverStatus::Unsat, SolverStatus::Unsat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let pc = Expr::and(vec![x().gt(Expr::int(0)), x().lt(Expr::int(0))]);
    orch.are_equivalent(ComparisonSite::new(Some(pc), x(), Expr::int(7)))
        .unwrap();
    assert_eq!(orch.partitions()[0].classification, Classification::Unreachable);
}

#[test]
fn uninterpreted_results_with_both_outcomes_are_maybe_neq() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Sat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let old = Expr::uif("f", SmtSort::Integer, vec![x()]);
    let new = Expr::uif("g", SmtSort::Integer, vec![x()]);
    let equivalent = orch.are_equivalent(ComparisonSite::new(None, old, new)).unwrap();
    assert!(!equivalent);

    let record = &orch.partitions()[0];
    assert_eq!(record.classification, Classification::MaybeNeq);
    assert!(record.uif.old && record.uif.new && !record.uif.pc);

    let neq = read(&dir, "IDiff-P1-ToSolve.txt");
    assert!(neq.contains("(declare-fun UF_f (Int) Int)"));
    assert!(neq.contains("(declare-fun UF_g (Int) Int)"));
    assert_eq!(read(&dir, "IDiff-P1-HasUIF.txt"), "true");
    // The raw status stays SAT in the record; only the answer file is downgraded.
    assert_eq!(read(&dir, "IDiff-P1-Answer.txt"), "unknown");
    assert_eq!(record.results.status(QueryKind::Neq), Some(SolverStatus::Sat));
}

#[test]
fn uif_answer_downgrade_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Sat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(
        EngineConfig {
            downgrade_uif_answers: false,
            ..config(&dir)
        },
        solver,
    )
    .unwrap();
    let old = Expr::uif("f", SmtSort::Integer, vec![x()]);
    orch.are_equivalent(ComparisonSite::new(None, old, x())).unwrap();
    assert_eq!(read(&dir, "IDiff-P1-Answer.txt"), "sat");
}

#[test]
fn uninterpreted_path_condition_is_maybe_eq() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let pc = Expr::uif("h", SmtSort::Integer, vec![x()]).gt(Expr::int(0));
    let equivalent = orch
        .are_equivalent(ComparisonSite::new(Some(pc), x(), x()))
        .unwrap();
    // The live answer follows the raw NEQ status even when the class is approximate.
    assert!(equivalent);
    assert_eq!(orch.partitions()[0].classification, Classification::MaybeEq);
}

#[test]
fn solver_error_marks_partition_and_run_continues() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::new(|kind, text| {
        if text.contains("INT9") && kind == QueryKind::Neq {
            Ok(answer(SolverStatus::Error))
        } else {
            Ok(answer(match kind {
                QueryKind::Neq => SolverStatus::Unsat,
                _ => SolverStatus::Sat,
            }))
        }
    });
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let bad = Expr::int_var("INT9");
    assert!(!orch.are_equivalent(ComparisonSite::new(None, bad.clone(), bad)).unwrap());
    assert!(orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap());

    let classes: Vec<_> = orch.partitions().iter().map(|r| r.classification).collect();
    assert_eq!(classes, vec![Classification::Error, Classification::Eq]);
    assert!(read(&dir, "IDiff-P1-Errors.txt").contains("unsupported"));
    // Solving stops at the failing query.
    assert!(!exists(&dir, "IDiff-P1-ToSolve-EQ.txt"));
    assert_eq!(read(&dir, "IDiff-P1-Answer.txt"), "error");
}

#[test]
fn launch_failure_is_an_error_partition() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::new(|_, _| {
        Err(SolverError::Spawn {
            command: "z3".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not installed"),
        })
    });
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    assert!(!orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap());
    let record = &orch.partitions()[0];
    assert_eq!(record.classification, Classification::Error);
    assert_eq!(record.errors.len(), 1);
    assert!(read(&dir, "IDiff-P1-Errors-PC.txt").contains("not installed"));
    assert_eq!(orch.backend().kinds(), vec![QueryKind::Reachability]);
}

#[test]
fn flagged_site_skips_the_solver() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let site = ComparisonSite::new(None, x(), x()).with_flags(OperationalFlags {
        is_error: true,
        ..Default::default()
    });
    assert!(!orch.are_equivalent(site).unwrap());
    assert_eq!(orch.partitions()[0].classification, Classification::Error);
    assert!(orch.backend().kinds().is_empty());
}

#[test]
fn timeout_flag_yields_timeout_on_reachable_path() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();
    let site = ComparisonSite::new(None, x(), x()).with_flags(OperationalFlags {
        is_timeout: true,
        ..Default::default()
    });
    orch.are_equivalent(site).unwrap();
    assert_eq!(orch.partitions()[0].classification, Classification::Timeout);
}

#[test]
fn depth_limit_solves_only_reachability() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Sat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    orch.depth_limit_reached(Some(x().ge(Expr::int(3)))).unwrap();
    let record = &orch.partitions()[0];
    assert_eq!(record.kind, PartitionKind::DepthLimit);
    assert_eq!(record.classification, Classification::DepthLimited);
    assert!(!record.equivalent);
    assert_eq!(orch.backend().kinds(), vec![QueryKind::Reachability]);
    assert!(exists(&dir, "IDiff-P1-JSON-PC.json"));
    assert!(exists(&dir, "IDiff-P1-ToSolve-PC.txt"));
    assert!(!exists(&dir, "IDiff-P1-ToSolve.txt"));
}

#[test]
fn unreachable_depth_limit_is_unreachable() {
    let dir = TempDir::new().unwrap();
    let solver =
        ScriptedSolver::statuses(SolverStatus::Unsat, SolverStatus::Sat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();
    orch.depth_limit_reached(Some(Expr::bool(false))).unwrap();
    assert_eq!(orch.partitions()[0].classification, Classification::Unreachable);
}

#[test]
fn reachability_can_be_skipped() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(
        EngineConfig {
            solve_reachability: false,
            ..config(&dir)
        },
        solver,
    )
    .unwrap();
    orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap();
    assert_eq!(orch.backend().kinds(), vec![QueryKind::Neq, QueryKind::Eq]);
    assert_eq!(orch.partitions()[0].classification, Classification::Eq);
    assert!(!exists(&dir, "IDiff-P1-ToSolve-PC.txt"));
}

#[test]
fn malformed_site_allocates_no_partition() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let broken = Expr::op(eqcheck_smt::Opcode::Add, vec![x()]);
    let err = orch
        .are_equivalent(ComparisonSite::new(None, broken, x()))
        .unwrap_err();
    assert!(matches!(err, EngineError::Synthesis(_)));
    assert!(!err.is_fatal());
    assert!(orch.partitions().is_empty());

    orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap();
    assert_eq!(orch.partitions()[0].id, PartitionId(1));
}

#[test]
fn choice_path_conditions_are_captured_once() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let pc = x().lt(Expr::int(10));
    orch.choice_path_condition(4, 1, Some(&pc)).unwrap();
    orch.choice_path_condition(4, 2, None).unwrap();
    let duplicate = orch.choice_path_condition(4, 1, Some(&pc)).unwrap_err();
    assert!(matches!(duplicate, EngineError::DuplicateChoice { state: 4, choice: 1 }));

    let json: serde_json::Value =
        serde_json::from_str(&read(&dir, "IDiff-S4-C1-JSON-PC.json")).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "kind": "operator",
            "op": "<",
            "operands": [
                {"kind": "variable", "name": "INT0", "sort": "integer"},
                {"kind": "literal", "value": "10", "sort": "integer"}
            ]
        })
    );
    assert!(!exists(&dir, "IDiff-S4-C2-JSON-PC.json"));
    assert!(orch.partitions().is_empty());
}

#[test]
fn marker_inside_a_variable_name_is_not_a_uif() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let pc = Expr::int_var("BUF_1").gt(Expr::int(0));
    assert!(orch
        .are_equivalent(ComparisonSite::new(Some(pc.clone()), x(), x()))
        .unwrap());
    orch.depth_limit_reached(Some(pc)).unwrap();

    let compared = &orch.partitions()[0];
    assert!(!compared.uif.any());
    assert_eq!(compared.classification, Classification::Eq);
    assert_eq!(read(&dir, "IDiff-P1-HasUIF.txt").trim(), "false");
    assert!(!orch.partitions()[1].uif.any());
}

#[test]
fn partition_ids_increase_across_kinds_and_summary_is_written() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap();
    orch.depth_limit_reached(None).unwrap();
    orch.are_equivalent(ComparisonSite::new(None, x(), x())).unwrap();

    let ids: Vec<u32> = orch.partitions().iter().map(|r| r.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let summary = orch.finish().unwrap();
    assert_eq!(summary.partitions, 3);
    assert_eq!(summary.count(Classification::Eq), 2);
    assert_eq!(summary.count(Classification::DepthLimited), 1);
    assert_eq!(summary.verdict, Classification::DepthLimited);

    let result: serde_json::Value =
        serde_json::from_str(&read(&dir, "IDiff-Result.json")).unwrap();
    assert_eq!(result["counts"]["EQ"], 2);
    assert_eq!(result["verdict"], "DEPTH_LIMITED");
}

#[test]
fn replay_skips_bad_events_and_keeps_going() {
    let dir = TempDir::new().unwrap();
    let solver = ScriptedSolver::statuses(SolverStatus::Sat, SolverStatus::Unsat, SolverStatus::Sat);
    let mut orch = Orchestrator::new(config(&dir), solver).unwrap();

    let events = vec![
        ExplorationEvent::Comparison(ComparisonSite::new(None, x(), x())),
        ExplorationEvent::Comparison(ComparisonSite::new(
            None,
            Expr::op(eqcheck_smt::Opcode::Not, vec![]),
            x(),
        )),
        ExplorationEvent::DepthLimit {
            path_condition: None,
        },
        ExplorationEvent::Choice {
            state: 1,
            choice: 0,
            path_condition: Some(Expr::bool(true)),
        },
    ];
    let outcomes = replay(&mut orch, events).unwrap();
    assert_eq!(outcomes[0], EventOutcome::Compared { equivalent: true });
    assert!(matches!(outcomes[1], EventOutcome::Skipped { .. }));
    assert_eq!(outcomes[2], EventOutcome::DepthLimited);
    assert_eq!(outcomes[3], EventOutcome::ChoiceCaptured);
    assert_eq!(orch.partitions().len(), 2);
}
