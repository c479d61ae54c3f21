//! Results of a backup run.
//!
//! A [BackupRun] collects one [CollectionResult] per configured collection.
//! Results are appended by the [DumpRunner] and never changed afterwards.

pub mod runner;

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use derive_more::{Display, Error};

pub use runner::DumpRunner;

use crate::dump::FailureCause;
use crate::schedule::Kind;

/// A single execution of the backup of all collections for one [Kind].
#[derive(Debug, Clone)]
pub struct BackupRun {
    kind: Kind,
    database: String,
    output_dir: PathBuf,
    started: DateTime<Local>,
    finished: Option<DateTime<Local>>,
    results: Vec<CollectionResult>,
    free_before: Option<u64>,
    free_after: Option<u64>,
}

impl BackupRun {
    pub(crate) fn new(
        kind: Kind,
        database: &str,
        output_dir: PathBuf,
        started: DateTime<Local>,
        free_before: Option<u64>,
    ) -> Self {
        Self {
            kind,
            database: database.to_string(),
            output_dir,
            started,
            finished: None,
            results: Vec::new(),
            free_before,
            free_after: None,
        }
    }

    pub(crate) fn record(&mut self, result: CollectionResult) {
        debug_assert!(self.finished.is_none(), "finished runs are immutable");
        self.results.push(result);
    }

    pub(crate) fn finish(&mut self, finished: DateTime<Local>, free_after: Option<u64>) {
        self.finished = Some(finished);
        self.free_after = free_after;
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// End of the run. Equals the start while the run is still in progress.
    pub fn finished(&self) -> DateTime<Local> {
        self.finished.unwrap_or(self.started)
    }

    pub fn results(&self) -> &[CollectionResult] {
        &self.results
    }

    /// Free bytes in the backup root sampled before the first dump.
    pub fn free_before(&self) -> Option<u64> {
        self.free_before
    }

    /// Free bytes in the backup root sampled after the last dump.
    pub fn free_after(&self) -> Option<u64> {
        self.free_after
    }

    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Success { .. }))
            .count()
    }

    /// The run succeeded if every collection was dumped.
    pub fn succeeded(&self) -> bool {
        self.results
            .iter()
            .all(|r| matches!(r.outcome, Outcome::Success { .. }))
    }

    /// Whether the run was aborted by a fatal error.
    pub fn aborted(&self) -> bool {
        self.results
            .iter()
            .any(|r| matches!(r.outcome, Outcome::Fatal(_)))
    }
}

/// Terminal result of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResult {
    pub collection: String,
    pub outcome: Outcome,
}

impl CollectionResult {
    pub fn new(collection: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            collection: collection.into(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Dumped. `size` is the artifact size if the artifact was found.
    Success { size: Option<u64> },
    /// The dump tool exited unsuccessfully.
    Failed(Failure),
    /// The dump tool couldn't be executed. No further collections were attempted.
    Fatal(FatalError),
    /// Not attempted because an earlier collection hit a fatal error.
    Skipped,
}

/// Details of an unsuccessful dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Printed command line, password masked.
    pub command: String,
    pub exit_code: Option<i32>,
    pub cause: FailureCause,
    /// File holding the diagnostic output, [None] if it couldn't be saved.
    pub diagnostic_file: Option<PathBuf>,
    /// Diagnostic output of the tool.
    pub diagnostic: String,
    pub at: DateTime<Local>,
    /// Free bytes in the output directory when the failure happened.
    pub free_space: Option<u64>,
}

/// Details of a dump tool that couldn't be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct FatalError {
    pub tool: String,
    pub reason: String,
    pub at: DateTime<Local>,
    pub free_space: Option<u64>,
}

/// Errors aborting a run before all results could be reported.
#[derive(Debug, Display, Error)]
pub enum RunError {
    /// The dated output directory can't be created.
    #[display("Creating output directory {} failed: {source}", path.display())]
    OutputDirectory { path: PathBuf, source: io::Error },
}

impl RunError {
    /// Name of the error category shown in critical reports.
    pub fn category(&self) -> &'static str {
        match self {
            RunError::OutputDirectory { .. } => "OutputDirectory",
        }
    }
}
