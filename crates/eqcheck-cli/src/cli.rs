//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Classify every execution partition of an old/new program pair as EQ, NEQ,\n\
    MAYBE_EQ, MAYBE_NEQ or an operational outcome, using an external SMT solver.\n\n\
    Typical flow:\n  \
    1. eqcheck replay trace.json --run-id IDiff --output-dir out\n  \
    2. eqcheck expected benchmarks/Suite/Name/Eq --root benchmarks\n\n\
    Single steps:\n  \
    - eqcheck synthesize site.json --kind neq\n  \
    - eqcheck classify --pc sat --neq unsat --eq sat";

#[derive(Parser)]
#[command(name = "eqcheck")]
#[command(about = "Per-partition equivalence checking of program versions via SMT")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// JSON engine configuration; command-line flags override its values
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Replay a recorded exploration trace and classify every partition
    Replay {
        /// Trace file: {"events": [...]}
        trace: PathBuf,

        /// Prefix of every artifact file name
        #[arg(long)]
        run_id: Option<String>,

        /// Directory receiving the per-partition artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Solver backend: z3 | cvc5
        #[arg(long)]
        solver: Option<String>,

        /// Per-query solver budget in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Benchmark directory whose expected verdict the run is checked against
        #[arg(long, requires = "bench_root")]
        benchmark: Option<PathBuf>,

        /// Root of the benchmark tree
        #[arg(long)]
        bench_root: Option<PathBuf>,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the SMT-LIB queries for one comparison site
    Synthesize {
        /// Comparison site file: {"path_condition": ..., "old": ..., "new": ...}
        site: PathBuf,

        /// Which query to print: pc | neq | eq | all
        #[arg(long, default_value = "all")]
        kind: String,

        /// File with SMT-LIB declarations that must not be redeclared
        #[arg(long)]
        known: Option<PathBuf>,
    },

    /// Classify one partition from its solver answers and flags
    Classify {
        /// Reachability answer: sat | unsat | unknown | none
        #[arg(long, default_value = "sat")]
        pc: String,

        /// NEQ answer: sat | unsat | unknown | none. Required unless an
        /// operational flag decides the class.
        #[arg(long, required_unless_present_any = ["error", "timeout", "depth_limited"])]
        neq: Option<String>,

        /// EQ answer: sat | unsat | unknown | none. Required unless an
        /// operational flag decides the class.
        #[arg(long, required_unless_present_any = ["error", "timeout", "depth_limited"])]
        eq: Option<String>,

        /// The path condition contains an uninterpreted function
        #[arg(long, default_value_t = false)]
        uif_pc: bool,

        /// Any input contains an uninterpreted function
        #[arg(long, default_value_t = false)]
        uif_any: bool,

        #[arg(long, default_value_t = false)]
        error: bool,

        #[arg(long, default_value_t = false)]
        timeout: bool,

        #[arg(long, default_value_t = false)]
        depth_limited: bool,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Look up the expected verdict of a benchmark directory
    Expected {
        /// Benchmark directory
        dir: PathBuf,

        /// Root of the benchmark tree
        #[arg(long)]
        root: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },
}
