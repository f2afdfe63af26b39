// Command handler for: Classify

use miette::IntoDiagnostic;
use serde::Serialize;

use eqcheck_engine::{classify, Classification, ClassifierInput, OperationalFlags};

use super::helpers::{parse_output_format, parse_status, print_json};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct ClassifyReport {
    classification: Classification,
    definitive: bool,
}

pub(crate) fn run_classify_command(
    pc: &str,
    neq: &str,
    eq: &str,
    uif_pc: bool,
    uif_any: bool,
    flags: OperationalFlags,
    format: &str,
) -> miette::Result<()> {
    let format = parse_output_format(format)?;
    let input = ClassifierInput::for_discovered(
        flags,
        parse_status(pc)?,
        parse_status(neq)?,
        parse_status(eq)?,
        uif_pc,
        // A UIF in the path condition is a UIF in the inputs.
        uif_any || uif_pc,
    );
    let classification = classify(&input).into_diagnostic()?;
    match format {
        OutputFormat::Json => print_json(&ClassifyReport {
            classification,
            definitive: classification.is_definitive(),
        })?,
        OutputFormat::Text => println!("{classification}"),
    }
    Ok(())
}
