//! Partition classification and run orchestration.
//!
//! The exploration engine reports comparison sites, depth-limit hits and
//! choice points through [`EquivalenceOracle`]. [`Orchestrator`] turns each
//! report into a classified, persisted partition and aggregates a
//! [`RunSummary`] at the end of the run.

pub mod artifacts;
pub mod benchmark;
pub mod classification;
pub mod config;
pub mod error;
pub mod oracle;
pub mod orchestrator;
pub mod partition;
pub mod replay;
pub mod summary;

pub use benchmark::{benchmark_name, expected_result, ExpectedResult};
pub use classification::{classify, Classification, ClassifierInput, ClassifierInvariantViolation};
pub use config::EngineConfig;
pub use error::EngineError;
pub use oracle::{ComparisonSite, EquivalenceOracle};
pub use orchestrator::Orchestrator;
pub use partition::{OperationalFlags, PartitionId, PartitionKind, PartitionRecord};
pub use summary::RunSummary;
