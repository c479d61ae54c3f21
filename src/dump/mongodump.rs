//! Implements [DumpTool] by spawning the `mongodump` executable.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{DumpRequest, DumpTool, ToolOutput};

/// The MongoDB Database Tools' `mongodump`.
#[derive(Debug, Clone)]
pub struct Mongodump {
    program: PathBuf,
}

impl Default for Mongodump {
    fn default() -> Self {
        Self::with_program("mongodump")
    }
}

impl Mongodump {
    /// Use `program` as executable. Resolved through `PATH` if it isn't a path.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DumpTool for Mongodump {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn dump(&self, request: &DumpRequest<'_>) -> io::Result<ToolOutput> {
        log::trace!(target: "dump::mongodump", "Running: {}", request.command_line(&self.name()));

        let output = Command::new(&self.program)
            .args(request.args())
            .stdin(Stdio::null())
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() && !stderr.trim().is_empty() {
            // mongodump reports progress on stderr
            log::debug!(target: "dump::mongodump", "{}", stderr.trim_end());
        }

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: stderr.into_owned(),
        })
    }

    fn version(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .inspect_err(|e| log::warn!(target: "dump::mongodump", "Querying version failed: {e}"))
            .ok()?;

        if !output.status.success() {
            log::warn!(target: "dump::mongodump", "Querying version failed: {}", output.status);
            return None;
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }
}
