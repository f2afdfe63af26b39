// Command handler for: Synthesize

use std::path::{Path, PathBuf};

use miette::IntoDiagnostic;

use eqcheck_engine::ComparisonSite;
use eqcheck_smt::declarations::KnownDeclarations;
use eqcheck_smt::{QueryKind, QuerySynthesizer};

use super::helpers::{load_config, parse_query_kind, read_file};

pub(crate) fn run_synthesize_command(
    config_path: Option<&Path>,
    site_path: PathBuf,
    kind: &str,
    known_path: Option<PathBuf>,
) -> miette::Result<()> {
    let selected = parse_query_kind(kind)?;
    let config = load_config(config_path)?;
    let known_text = match known_path {
        Some(path) => read_file(&path)?,
        None => config.known_declarations,
    };
    let site: ComparisonSite =
        serde_json::from_str(&read_file(&site_path)?).into_diagnostic()?;

    let synthesizer = QuerySynthesizer::new(KnownDeclarations::parse(&known_text));
    let queries = synthesizer
        .synthesize(site.path_condition.as_ref(), &site.old, &site.new)
        .into_diagnostic()?;

    let kinds: Vec<QueryKind> = match selected {
        Some(kind) => vec![kind],
        None => QueryKind::ALL.to_vec(),
    };
    for (index, kind) in kinds.iter().enumerate() {
        if kinds.len() > 1 {
            if index > 0 {
                println!();
            }
            println!(";; ---- {kind} query ----");
        }
        print!("{}", queries.get(*kind).text);
    }
    Ok(())
}
