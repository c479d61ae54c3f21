//! Rendering of status reports.
//!
//! The builders return plain text. Escaping for the destination's markup is
//! left to the [Notifier](crate::notify::Notifier).

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Local, TimeDelta};

use crate::backup::{BackupRun, Failure, FatalError, Outcome};
use crate::schedule::Kind;
use crate::util::disk::format_gb;
use crate::util::{folder_size, format_size};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MIB: f64 = 1024.0 * 1024.0;
const VERSION_UNAVAILABLE: &str = "unavailable";
/// Characters of diagnostic output shown inline when no file could be attached.
const INLINE_DIAGNOSTIC_LIMIT: usize = 1000;

/// Summary of a finished [BackupRun].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub kind: Kind,
    pub succeeded: bool,
    pub success_count: usize,
    pub total: usize,
    /// Bytes of everything in the output directory.
    pub total_size: u64,
    /// Artifact size per successfully dumped collection, in backup order.
    pub sizes: Vec<(String, u64)>,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub tool_version: String,
    pub free_before: Option<u64>,
    pub free_after: Option<u64>,
    pub output_dir: std::path::PathBuf,
}

impl RunReport {
    /// Derive the report of `run`. A missing `tool_version` is shown as unavailable.
    pub fn new(run: &BackupRun, tool_version: Option<String>) -> Self {
        let sizes = run
            .results()
            .iter()
            .filter_map(|result| match result.outcome {
                Outcome::Success { size: Some(size) } => Some((result.collection.clone(), size)),
                _ => None,
            })
            .collect();

        Self {
            kind: run.kind(),
            succeeded: run.succeeded(),
            success_count: run.success_count(),
            total: run.results().len(),
            total_size: folder_size(run.output_dir()),
            sizes,
            started: run.started(),
            finished: run.finished(),
            tool_version: tool_version.unwrap_or_else(|| VERSION_UNAVAILABLE.to_string()),
            free_before: run.free_before(),
            free_after: run.free_after(),
            output_dir: run.output_dir().to_path_buf(),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.finished - self.started
    }
}

/// Render a duration as `H:MM:SS`.
pub fn format_duration(duration: TimeDelta) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

/// Report announcing a run and the collections queued for it.
pub fn build_start(kind: Kind, database: &str, output_dir: &Path, collections: &[String]) -> String {
    let mut msg = format!(
        "🚨 {} BACKUP STARTED\n\
         Database: {database}\n\
         Destination: {}\n\
         Collections queued: {}\n",
        kind.to_string().to_uppercase(),
        output_dir.display(),
        collections.len(),
    );
    for collection in collections {
        let _ = writeln!(msg, "      - {collection}");
    }
    msg
}

/// Report of a single collection whose dump failed.
pub fn build_per_collection_error(collection: &str, failure: &Failure) -> String {
    let exit_code = failure
        .exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "none (terminated by signal)".to_string());
    let diagnostic = match &failure.diagnostic_file {
        Some(path) => format!(
            "Diagnostic output saved to: {} (attached)",
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
        None => {
            let text = failure.diagnostic.trim();
            let mut inline: String = text.chars().take(INLINE_DIAGNOSTIC_LIMIT).collect();
            if inline.len() < text.len() {
                inline.push_str(" [...]");
            }
            format!("Diagnostic output (not saved): {inline}")
        }
    };

    format!(
        "❌ BACKUP ERROR ❌\n\
         Date/Time: {}\n\
         Collection: {collection}\n\
         Command: {}\n\
         Exit code: {exit_code}\n\
         {diagnostic}\n\
         Free space: {}\n\
         Probable cause: {}",
        failure.at.format(TIMESTAMP_FORMAT),
        failure.command,
        format_gb(failure.free_space),
        failure.cause,
    )
}

/// Report of a dump tool that couldn't be executed.
pub fn build_fatal(collection: &str, fatal: &FatalError) -> String {
    format!(
        "❌ FATAL BACKUP ERROR ❌\n\
         Date/Time: {}\n\
         Collection: {collection}\n\
         Problem: the dump tool `{}` could not be executed: {}\n\
         Make sure the MongoDB Database Tools are installed and on PATH.\n\
         Remaining collections were not attempted.\n\
         Free space: {}",
        fatal.at.format(TIMESTAMP_FORMAT),
        fatal.tool,
        fatal.reason,
        format_gb(fatal.free_space),
    )
}

/// Final report of a run with at least one unsuccessful collection.
pub fn build_failure_summary(run: &BackupRun) -> String {
    let blocks: Vec<_> = run
        .results()
        .iter()
        .filter_map(|result| match &result.outcome {
            Outcome::Failed(failure) => Some(build_per_collection_error(&result.collection, failure)),
            Outcome::Fatal(fatal) => Some(build_fatal(&result.collection, fatal)),
            Outcome::Success { .. } | Outcome::Skipped => None,
        })
        .collect();

    format!(
        "🔴 {} BACKUP FAILED (with errors) 🔴\n\
         Database: {}\n\
         Successful collections: {}/{}\n\
         Path: {}\n\
         \n\
         -- ERROR DETAILS --\n\
         \n\
         {}",
        run.kind().to_string().to_uppercase(),
        run.database(),
        run.success_count(),
        run.results().len(),
        run.output_dir().display(),
        blocks.join("\n\n"),
    )
}

/// Final report of a run where every collection was dumped.
pub fn build_success_summary(report: &RunReport) -> String {
    let mut msg = format!(
        "✅ BACKUP SUCCEEDED ✅\n\
         Kind: {}\n\
         Collections: {}\n\
         Total size: {}\n\
         Start: {} | End: {}\n\
         Duration: {}\n\
         Dump tool version: {}\n\
         Free space: {} (before) | {} (after)\n\
         Size per collection:\n",
        report.kind.to_string().to_uppercase(),
        report.success_count,
        format_size(report.total_size),
        report.started.format(TIMESTAMP_FORMAT),
        report.finished.format(TIMESTAMP_FORMAT),
        format_duration(report.duration()),
        report.tool_version,
        format_gb(report.free_before),
        format_gb(report.free_after),
    );
    for (collection, size) in &report.sizes {
        let _ = writeln!(msg, "      - {collection}: {:.2} MB", *size as f64 / MIB);
    }
    let _ = write!(msg, "Local path: {}", report.output_dir.display());
    msg
}

/// Report of an unexpected error in the orchestration itself.
pub fn build_critical(category: &str, message: &str) -> String {
    format!(
        "🔥🔥 CRITICAL SCRIPT ERROR 🔥🔥\n\
         The process failed with an unexpected error. Category: `{category}`\n\
         Detail: {message}"
    )
}
