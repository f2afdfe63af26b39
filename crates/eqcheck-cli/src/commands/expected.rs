// Command handler for: Expected

use std::path::Path;

use miette::IntoDiagnostic;
use serde::Serialize;

use eqcheck_engine::{benchmark_name, expected_result, ExpectedResult};

use super::helpers::{parse_output_format, print_json};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct ExpectedReport {
    benchmark: String,
    expected: ExpectedResult,
}

pub(crate) fn run_expected_command(dir: &Path, root: &Path, format: &str) -> miette::Result<()> {
    let format = parse_output_format(format)?;
    let report = ExpectedReport {
        benchmark: benchmark_name(root, dir).into_diagnostic()?,
        expected: expected_result(root, dir).into_diagnostic()?,
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => println!("{}\t{}", report.benchmark, report.expected),
    }
    Ok(())
}
