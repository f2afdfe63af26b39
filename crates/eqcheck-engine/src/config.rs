use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eqcheck_smt::backends::process_backend::SolverConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run-level settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Prefix of every artifact file name.
    pub run_id: String,
    pub output_dir: PathBuf,
    pub solver: SolverConfig,
    /// SMT-LIB declarations already known to the run; never redeclared.
    pub known_declarations: String,
    /// Write `unknown` as the NEQ answer when it is SAT but relies on UIFs.
    pub downgrade_uif_answers: bool,
    /// Solve the path-condition reachability query.
    pub solve_reachability: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_id: "run".to_string(),
            output_dir: PathBuf::from("eqcheck-out"),
            solver: SolverConfig::default(),
            known_declarations: String::new(),
            downgrade_uif_answers: true,
            solve_reachability: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
