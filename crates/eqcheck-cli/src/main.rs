mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use eqcheck_engine::OperationalFlags;

use cli::{Cli, Commands};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Replay {
            trace,
            run_id,
            output_dir,
            solver,
            timeout,
            benchmark,
            bench_root,
            format,
        } => commands::replay::run_replay_command(
            config, trace, run_id, output_dir, solver, timeout, benchmark, bench_root, &format,
        ),
        Commands::Synthesize { site, kind, known } => {
            commands::synthesize::run_synthesize_command(config, site, &kind, known)
        }
        Commands::Classify {
            pc,
            neq,
            eq,
            uif_pc,
            uif_any,
            error,
            timeout,
            depth_limited,
            format,
        } => commands::classify::run_classify_command(
            &pc,
            neq.as_deref().unwrap_or("none"),
            eq.as_deref().unwrap_or("none"),
            uif_pc,
            uif_any,
            OperationalFlags {
                is_error: error,
                is_timeout: timeout,
                is_depth_limited: depth_limited,
            },
            &format,
        ),
        Commands::Expected { dir, root, format } => {
            commands::expected::run_expected_command(&dir, &root, &format)
        }
    }
}
