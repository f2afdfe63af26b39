use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, WrapErr};
use serde::Serialize;

use eqcheck_engine::EngineConfig;
use eqcheck_smt::backends::process_backend::SolverKind;
use eqcheck_smt::{QueryKind, SolverStatus};

use crate::OutputFormat;

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => miette::bail!("Unknown output format: {other}. Use 'text' or 'json'."),
    }
}

pub(crate) fn parse_solver_kind(raw: &str) -> miette::Result<SolverKind> {
    match raw {
        "z3" => Ok(SolverKind::Z3),
        "cvc5" => Ok(SolverKind::Cvc5),
        other => miette::bail!("Unknown solver: {other}. Use 'z3' or 'cvc5'."),
    }
}

/// `none` means the query was not run.
pub(crate) fn parse_status(raw: &str) -> miette::Result<Option<SolverStatus>> {
    match raw {
        "sat" => Ok(Some(SolverStatus::Sat)),
        "unsat" => Ok(Some(SolverStatus::Unsat)),
        "unknown" => Ok(Some(SolverStatus::Unknown)),
        "none" => Ok(None),
        other => miette::bail!("Unknown solver answer: {other}. Use sat, unsat, unknown or none."),
    }
}

/// `None` selects every query.
pub(crate) fn parse_query_kind(raw: &str) -> miette::Result<Option<QueryKind>> {
    match raw {
        "pc" => Ok(Some(QueryKind::Reachability)),
        "neq" => Ok(Some(QueryKind::Neq)),
        "eq" => Ok(Some(QueryKind::Eq)),
        "all" => Ok(None),
        other => miette::bail!("Unknown query kind: {other}. Use pc, neq, eq or all."),
    }
}

pub(crate) fn load_config(path: Option<&Path>) -> miette::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path).into_diagnostic(),
        None => Ok(EngineConfig::default()),
    }
}

pub(crate) fn read_file(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> miette::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).into_diagnostic()?
    );
    Ok(())
}
