//! On-disk artifacts of a run.
//!
//! Every partition leaves `<runId>-P<n>-<kind>` files in the output directory;
//! choice-point path conditions are written as `<runId>-S<state>-C<choice>-JSON-PC.json`.
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never observes a half-written artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use eqcheck_smt::QueryKind;

use crate::partition::PartitionId;

#[derive(Debug, Error)]
#[error("cannot write artifact {}: {source}", path.display())]
pub struct ArtifactError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// One artifact of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ToSolve(QueryKind),
    Answer(QueryKind),
    Errors(QueryKind),
    /// Satisfying assignment of the NEQ query.
    Model,
    JsonPc,
    HasUif,
    Partition,
}

impl ArtifactKind {
    pub fn file_suffix(self) -> String {
        match self {
            ArtifactKind::ToSolve(kind) => format!("ToSolve{}.txt", kind.artifact_suffix()),
            ArtifactKind::Answer(kind) => format!("Answer{}.txt", kind.artifact_suffix()),
            ArtifactKind::Errors(kind) => format!("Errors{}.txt", kind.artifact_suffix()),
            ArtifactKind::Model => "Model.txt".to_string(),
            ArtifactKind::JsonPc => "JSON-PC.json".to_string(),
            ArtifactKind::HasUif => "HasUIF.txt".to_string(),
            ArtifactKind::Partition => "Partition.json".to_string(),
        }
    }
}

/// Restrict a run id to characters that are safe in file names.
pub fn sanitize_run_id(raw: &str) -> String {
    let mut out = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else if ch == '.' || ch == '/' || ch == '\\' || ch.is_whitespace() {
            out.push('_');
        }
    }
    let compact = out.trim_matches('_');
    if compact.is_empty() {
        "run".to_string()
    } else {
        compact.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    run_id: String,
}

impl ArtifactStore {
    /// Open (creating if needed) the output directory for `run_id`.
    pub fn new(dir: impl Into<PathBuf>, run_id: &str) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ArtifactError {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            run_id: sanitize_run_id(run_id),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn partition_path(&self, id: PartitionId, kind: ArtifactKind) -> PathBuf {
        self.dir
            .join(format!("{}-P{}-{}", self.run_id, id.0, kind.file_suffix()))
    }

    pub fn choice_path(&self, state_id: u64, choice_id: u64) -> PathBuf {
        self.dir
            .join(format!("{}-S{state_id}-C{choice_id}-JSON-PC.json", self.run_id))
    }

    pub fn result_path(&self) -> PathBuf {
        self.dir.join(format!("{}-Result.json", self.run_id))
    }

    pub fn write_partition(
        &self,
        id: PartitionId,
        kind: ArtifactKind,
        contents: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.partition_path(id, kind);
        self.write(&path, contents)?;
        Ok(path)
    }

    /// Atomically replace `path` with `contents`.
    pub fn write(&self, path: &Path, contents: &str) -> Result<(), ArtifactError> {
        let fail = |source| ArtifactError {
            path: path.to_path_buf(),
            source,
        };
        let parent = path.parent().unwrap_or(&self.dir);
        let mut tmp = NamedTempFile::new_in(parent).map_err(fail)?;
        tmp.write_all(contents.as_bytes()).map_err(fail)?;
        tmp.flush().map_err(fail)?;
        tmp.persist(path).map_err(|e| fail(e.error))?;
        Ok(())
    }
}
