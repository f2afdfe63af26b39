// Command handler for: Replay

use std::path::{Path, PathBuf};

use miette::IntoDiagnostic;
use serde::Serialize;
use tracing::info;

use eqcheck_engine::replay::{replay, EventOutcome, Trace};
use eqcheck_engine::{
    expected_result, Classification, ExpectedResult, Orchestrator, PartitionKind, RunSummary,
};

use super::helpers::{
    load_config, parse_output_format, parse_solver_kind, print_json, read_file,
};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
pub(crate) struct PartitionLine {
    pub(crate) id: u32,
    pub(crate) kind: PartitionKind,
    pub(crate) classification: Classification,
    pub(crate) equivalent: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReplayReport {
    pub(crate) summary: RunSummary,
    pub(crate) partitions: Vec<PartitionLine>,
    pub(crate) outcomes: Vec<EventOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) expected: Option<ExpectedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) matches_expected: Option<bool>,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn run_replay_command(
    config_path: Option<&Path>,
    trace_path: PathBuf,
    run_id: Option<String>,
    output_dir: Option<PathBuf>,
    solver: Option<String>,
    timeout: Option<u64>,
    benchmark: Option<PathBuf>,
    bench_root: Option<PathBuf>,
    format: &str,
) -> miette::Result<()> {
    let format = parse_output_format(format)?;
    let mut config = load_config(config_path)?;
    if let Some(run_id) = run_id {
        config.run_id = run_id;
    }
    if let Some(output_dir) = output_dir {
        config.output_dir = output_dir;
    }
    if let Some(solver) = solver {
        config.solver.kind = parse_solver_kind(&solver)?;
        config.solver.command = None;
        config.solver.args.clear();
    }
    if let Some(timeout) = timeout {
        config.solver.timeout_secs = timeout;
    }

    let expected = match (&benchmark, &bench_root) {
        (Some(dir), Some(root)) => Some(expected_result(root, dir).into_diagnostic()?),
        _ => None,
    };

    let trace = Trace::from_json_str(&read_file(&trace_path)?).into_diagnostic()?;
    info!(
        trace = %trace_path.display(),
        events = trace.events.len(),
        "Replaying exploration trace"
    );

    let mut orchestrator = Orchestrator::from_config(config).into_diagnostic()?;
    let outcomes = replay(&mut orchestrator, trace.events).into_diagnostic()?;
    let partitions = orchestrator
        .partitions()
        .iter()
        .map(|record| PartitionLine {
            id: record.id.0,
            kind: record.kind,
            classification: record.classification,
            equivalent: record.equivalent,
        })
        .collect();
    let summary = orchestrator.finish().into_diagnostic()?;
    let matches_expected = expected.map(|e| summary.matches_expected(e));

    let report = ReplayReport {
        summary,
        partitions,
        outcomes,
        expected,
        matches_expected,
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", render_replay_text(&report)),
    }
    Ok(())
}

pub(crate) fn render_replay_text(report: &ReplayReport) -> String {
    let mut out = String::new();
    for line in &report.partitions {
        let marker = match line.kind {
            PartitionKind::Comparison if line.equivalent => "  (equivalent)",
            _ => "",
        };
        out.push_str(&format!(
            "P{:<4} {:<18}{marker}\n",
            line.id,
            line.classification.to_string()
        ));
    }
    let skipped = report
        .outcomes
        .iter()
        .filter(|o| matches!(o, EventOutcome::Skipped { .. }))
        .count();
    if skipped > 0 {
        out.push_str(&format!("Skipped events: {skipped}\n"));
    }
    out.push_str(&format!(
        "Run {}: {} partitions, verdict {}\n",
        report.summary.run_id, report.summary.partitions, report.summary.verdict
    ));
    for (class, count) in &report.summary.counts {
        out.push_str(&format!("  {class}: {count}\n"));
    }
    if let (Some(expected), Some(matches)) = (report.expected, report.matches_expected) {
        let status = if matches { "match" } else { "MISMATCH" };
        out.push_str(&format!("Expected: {expected} ({status})\n"));
    }
    out
}
