//! Ground-truth lookup for benchmark directories.
//!
//! Benchmarks live under `<root>/<suite>/<name>/<Eq|NEq>/...`. The expected
//! verdict is read from the second or third path component relative to root.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::classification::Classification;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BenchmarkError {
    #[error("{} is not inside benchmark root {}", dir.display(), root.display())]
    OutsideRoot { dir: PathBuf, root: PathBuf },
    #[error("cannot determine expected result for {}", dir.display())]
    NoExpectedResult { dir: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpectedResult {
    Eq,
    Neq,
}

impl ExpectedResult {
    fn from_component(name: &str) -> Option<Self> {
        match name {
            "Eq" => Some(ExpectedResult::Eq),
            "NEq" => Some(ExpectedResult::Neq),
            _ => None,
        }
    }

    pub fn classification(self) -> Classification {
        match self {
            ExpectedResult::Eq => Classification::Eq,
            ExpectedResult::Neq => Classification::Neq,
        }
    }
}

impl std::fmt::Display for ExpectedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.classification().fmt(f)
    }
}

fn relative_components(root: &Path, dir: &Path) -> Result<Vec<String>, BenchmarkError> {
    let rel = dir.strip_prefix(root).map_err(|_| BenchmarkError::OutsideRoot {
        dir: dir.to_path_buf(),
        root: root.to_path_buf(),
    })?;
    Ok(rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect())
}

/// Expected verdict of the benchmark at `dir`.
pub fn expected_result(root: &Path, dir: &Path) -> Result<ExpectedResult, BenchmarkError> {
    let components = relative_components(root, dir)?;
    components
        .iter()
        .skip(1)
        .take(2)
        .find_map(|name| ExpectedResult::from_component(name))
        .ok_or_else(|| BenchmarkError::NoExpectedResult {
            dir: dir.to_path_buf(),
        })
}

/// Display name of a benchmark: its first three components relative to root.
pub fn benchmark_name(root: &Path, dir: &Path) -> Result<String, BenchmarkError> {
    let components = relative_components(root, dir)?;
    Ok(components.into_iter().take(3).collect::<Vec<_>>().join("/"))
}
