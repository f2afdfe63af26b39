//! Expression model, SMT query synthesis and solver integration for
//! per-partition equivalence checking.
//!
//! This crate turns a path condition and two result expressions (old and new
//! program version) into reachability, inequality and equality queries, and
//! runs them through an external SMT solver process.

pub mod backends;
pub mod declarations;
pub mod interchange;
pub mod query;
pub mod solver;
pub mod sorts;
pub mod terms;
pub mod uif;

pub use query::{QueryKind, QuerySet, QuerySynthesizer, SolverQuery, SynthesisError};
pub use solver::{SolverBackend, SolverError, SolverResult, SolverStatus};
pub use sorts::SmtSort;
pub use terms::{Expr, Opcode, StructuralError};
