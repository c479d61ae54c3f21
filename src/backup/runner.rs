//! Sequential dump of all configured collections.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::{BackupRun, CollectionResult, Failure, FatalError, Outcome, RunError};
use crate::config::BackupConfig;
use crate::dump::{dump_collection, DumpOutcome, DumpRequest, DumpTool, FailureCause};
use crate::notify::{deliver, Notifier};
use crate::report::{self, RunReport};
use crate::schedule::Kind;
use crate::util::disk::free_space_or_log;

/// Runs the dump tool once per collection and reports the progress.
pub struct DumpRunner<'a, T: ?Sized, N: ?Sized> {
    config: &'a BackupConfig,
    tool: &'a T,
    notifier: &'a N,
}

impl<'a, T, N> DumpRunner<'a, T, N>
where
    T: DumpTool + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(config: &'a BackupConfig, tool: &'a T, notifier: &'a N) -> Self {
        Self {
            config,
            tool,
            notifier,
        }
    }

    /// Backup all collections into a new run of `kind`.
    pub fn run(&self, kind: Kind) -> Result<BackupRun, RunError> {
        self.run_at(kind, Local::now())
    }

    /// Like [run](Self::run), naming the output directory after `now`.
    ///
    /// Failing dumps are reported and recorded, only an unusable output
    /// directory ends the run with an [Err].
    pub fn run_at(&self, kind: Kind, now: DateTime<Local>) -> Result<BackupRun, RunError> {
        let config = self.config;
        let output_dir = config.backup_root.join(kind.folder_name(now.date_naive()));
        fs::create_dir_all(&output_dir).map_err(|source| RunError::OutputDirectory {
            path: output_dir.clone(),
            source,
        })?;

        let free_before = free_space_or_log(&config.backup_root);
        let mut run = BackupRun::new(kind, &config.database_name, output_dir, now, free_before);

        let start = report::build_start(
            kind,
            &config.database_name,
            run.output_dir(),
            &config.collections,
        );
        deliver(self.notifier, &start, None);
        log::info!(target: "backup::runner", "Starting {kind} backup into {}", run.output_dir().display());

        let mut collections = config.collections.iter();
        for collection in collections.by_ref() {
            let outcome = self.backup_collection(collection, run.output_dir());
            let fatal = matches!(outcome, Outcome::Fatal(_));
            run.record(CollectionResult::new(collection, outcome));
            if fatal {
                break;
            }
        }
        for skipped in collections {
            log::warn!(target: "backup::runner", "Skipping collection {skipped} after fatal error");
            run.record(CollectionResult::new(skipped, Outcome::Skipped));
        }

        run.finish(Local::now(), free_space_or_log(&config.backup_root));

        let summary = if run.succeeded() {
            let report = RunReport::new(&run, self.tool.version());
            report::build_success_summary(&report)
        } else {
            report::build_failure_summary(&run)
        };
        deliver(self.notifier, &summary, None);
        log::info!(
            target: "backup::runner",
            "Finished {kind} backup: {}/{} collections succeeded",
            run.success_count(),
            run.results().len()
        );

        Ok(run)
    }

    fn backup_collection(&self, collection: &str, output_dir: &Path) -> Outcome {
        let request = DumpRequest {
            uri: &self.config.uri,
            database: &self.config.database_name,
            collection,
            output_dir,
        };
        log::info!(target: "backup::runner", "Backing up collection {collection}");

        match dump_collection(self.tool, &request) {
            DumpOutcome::Success { size } => {
                log::info!(target: "backup::runner", "Collection {collection} backed up");
                Outcome::Success { size }
            }
            DumpOutcome::Failure {
                exit_code,
                diagnostic,
            } => {
                let at = Local::now();
                let diagnostic_file = write_diagnostic(output_dir, collection, at, &diagnostic)
                    .inspect_err(|e| {
                        log::error!(target: "backup::runner", "Saving diagnostic output of {collection} failed: {e}")
                    })
                    .ok();
                let failure = Failure {
                    command: request.command_line(&self.tool.name()),
                    exit_code,
                    cause: FailureCause::from_exit_code(exit_code),
                    diagnostic_file,
                    diagnostic,
                    at,
                    free_space: free_space_or_log(output_dir),
                };
                log::error!(target: "backup::runner", "Backup of {collection} failed: {}", failure.diagnostic.trim_end());

                let msg = report::build_per_collection_error(collection, &failure);
                deliver(self.notifier, &msg, failure.diagnostic_file.as_deref());
                Outcome::Failed(failure)
            }
            DumpOutcome::Fatal { reason } => {
                let fatal = FatalError {
                    tool: self.tool.name(),
                    reason,
                    at: Local::now(),
                    free_space: free_space_or_log(output_dir),
                };
                let msg = report::build_fatal(collection, &fatal);
                log::error!(target: "backup::runner", "{msg}");
                deliver(self.notifier, &msg, None);
                Outcome::Fatal(fatal)
            }
        }
    }
}

/// Name of the diagnostic file of `collection` failing at `at`.
///
/// `attempt` disambiguates files created within the same second.
/// Path separators in the collection name are replaced.
fn diagnostic_file_name(collection: &str, at: DateTime<Local>, attempt: usize) -> String {
    let collection = collection.replace(['/', '\\'], "_");
    let timestamp = at.format("%Y%m%d_%H%M%S");
    if attempt == 0 {
        format!("error_{collection}_{timestamp}.txt")
    } else {
        format!("error_{collection}_{timestamp}_{attempt}.txt")
    }
}

/// Save `diagnostic` to a new file in `output_dir`. Existing files are never overwritten.
fn write_diagnostic(
    output_dir: &Path,
    collection: &str,
    at: DateTime<Local>,
    diagnostic: &str,
) -> io::Result<PathBuf> {
    let mut attempt = 0;
    let (path, mut file) = loop {
        let path = output_dir.join(diagnostic_file_name(collection, at, attempt));
        match File::create_new(&path) {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    };

    file.write_all(diagnostic.as_bytes())?;
    file.flush()?;
    log::debug!(target: "backup::runner", "Saved diagnostic output to {}", path.display());

    Ok(path)
}
