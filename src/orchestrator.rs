//! Top level workflow of an invocation: schedule, run, report.

use std::process::ExitCode;

use chrono::NaiveDate;

use crate::backup::DumpRunner;
use crate::config::BackupConfig;
use crate::dump::DumpTool;
use crate::notify::{deliver, Notifier};
use crate::report;
use crate::schedule::{self, Kind};

/// How an invocation ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// No backup was due.
    NothingDue,
    /// All due runs were attempted and reported, regardless of dump failures.
    Completed,
    /// At least one run ended with an unexpected error.
    Critical,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::NothingDue | Status::Completed => ExitCode::SUCCESS,
            Status::Critical => ExitCode::FAILURE,
        }
    }
}

/// Run every backup due on `today`.
///
/// Monthly runs before weekly. An unexpected error of one run is reported as
/// critical and doesn't keep the other kind from running.
pub fn execute<T, N>(
    config: &BackupConfig,
    tool: &T,
    notifier: &N,
    today: NaiveDate,
    forced: Option<Kind>,
) -> Status
where
    T: DumpTool + ?Sized,
    N: Notifier + ?Sized,
{
    let schedule = schedule::decide(today, config, forced);
    if schedule.is_empty() {
        log::info!(target: "orchestrator", "No backup due today. Exiting.");
        return Status::NothingDue;
    }

    let runner = DumpRunner::new(config, tool, notifier);
    let mut status = Status::Completed;
    for kind in schedule.kinds() {
        match runner.run(kind) {
            Ok(run) if run.aborted() => {
                log::error!(target: "orchestrator", "{kind} backup aborted by a fatal error");
            }
            Ok(run) => {
                log::info!(target: "orchestrator", "{kind} backup done, errors detected: {}", !run.succeeded());
            }
            Err(e) => {
                log::error!(target: "orchestrator", "Critical error in {kind} backup: {e}");
                deliver(notifier, &report::build_critical(e.category(), &e.to_string()), None);
                status = Status::Critical;
            }
        }
    }

    status
}
