use std::io;
use std::path::Path;

use nix::sys::statvfs::statvfs;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Bytes available to unprivileged users on the filesystem containing `path`.
pub fn free_space(path: &Path) -> io::Result<u64> {
    let stat = statvfs(path).map_err(io::Error::from)?;
    Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
}

/// Free space at `path`, or [None] (logged) if the query fails.
pub fn free_space_or_log(path: &Path) -> Option<u64> {
    free_space(path)
        .inspect_err(|e| {
            log::warn!(target: "util::disk", "Querying free space of {} failed: {e}", path.display())
        })
        .ok()
}

/// Render bytes as gibibytes with two decimals.
pub fn format_gb(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format!("{:.2} GB", bytes as f64 / GIB),
        None => "unknown".to_string(),
    }
}
