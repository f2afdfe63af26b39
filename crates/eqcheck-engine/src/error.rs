use thiserror::Error;

use eqcheck_smt::interchange::InterchangeError;
use eqcheck_smt::SynthesisError;

use crate::artifacts::ArtifactError;
use crate::benchmark::BenchmarkError;
use crate::classification::ClassifierInvariantViolation;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed expression at a comparison site; the partition is abandoned.
    #[error("cannot build solver queries: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("cannot serialize path condition: {0}")]
    Interchange(#[from] InterchangeError),
    #[error(transparent)]
    Classifier(#[from] ClassifierInvariantViolation),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot encode artifact: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),
    #[error("path condition for state {state}, choice {choice} was already captured")]
    DuplicateChoice { state: u64, choice: u64 },
}

impl EngineError {
    /// Fatal errors abort the whole run; the rest only abandon one partition
    /// or event.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Classifier(_)
                | EngineError::Artifact(_)
                | EngineError::Config(_)
                | EngineError::Encode(_)
        )
    }
}
